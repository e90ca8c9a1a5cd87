// railnav_core/src/utils/serde_helpers.rs

/// (De)serializes a `Vector3<f64>` as a plain `[x, y, z]` array.
/// Used for configuration values such as sensor biases.
pub mod vec3_from_array {
    use nalgebra::Vector3;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(vec: &Vector3<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let arr = [vec.x, vec.y, vec.z];
        serializer.collect_seq(arr.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vector3<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let arr: [f64; 3] = Deserialize::deserialize(deserializer)?;
        Ok(Vector3::new(arr[0], arr[1], arr[2]))
    }
}

/// (De)serializes a `Vector3<f64>` as an `{ "x": .., "y": .., "z": .. }` object,
/// the shape the relay and the dashboard exchange.
pub mod vec3_as_xyz {
    use nalgebra::Vector3;
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Xyz {
        x: f64,
        y: f64,
        z: f64,
    }

    pub fn serialize<S>(vec: &Vector3<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Xyz {
            x: vec.x,
            y: vec.y,
            z: vec.z,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vector3<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let xyz = Xyz::deserialize(deserializer)?;
        Ok(Vector3::new(xyz.x, xyz.y, xyz.z))
    }
}
