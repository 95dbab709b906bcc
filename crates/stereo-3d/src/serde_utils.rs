//! Serialization helpers for glam types that are reported in a fixed layout.

/// Serialize a unit quaternion as `[w, x, y, z]`.
pub(crate) mod quat_wxyz {
    use glam::DQuat;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(q: &DQuat, serializer: S) -> Result<S::Ok, S::Error> {
        [q.w, q.x, q.y, q.z].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DQuat, D::Error> {
        let [w, x, y, z] = <[f64; 4]>::deserialize(deserializer)?;
        Ok(DQuat::from_xyzw(x, y, z, w))
    }
}
