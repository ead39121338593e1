use serde::{Deserialize, Serialize};

/// One entry of the public room listing. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub code: String,
    /// Players currently in the room.
    pub quant: u32,
    /// Room capacity.
    pub max: u32,
}

impl RoomRecord {
    #[cfg(test)]
    pub fn new(code: impl Into<String>, quant: u32, max: u32) -> Self {
        Self {
            code: code.into(),
            quant,
            max,
        }
    }

    pub fn occupancy(&self) -> String {
        format!("{}/{}", self.quant, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupancy() {
        assert_eq!(RoomRecord::new("49r1Q8", 3, 8).occupancy(), "3/8");
    }

    #[test]
    fn test_ignores_extra_fields() {
        let room: RoomRecord =
            serde_json::from_str(r#"{"code":"x1","quant":2,"max":6,"lang":19,"viewers":0}"#)
                .unwrap();
        assert_eq!(room, RoomRecord::new("x1", 2, 6));
    }
}
