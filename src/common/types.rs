use strum_macros::Display;

/// Body model gender. The converter always emits `Neutral`; the other
/// variants exist so archives written elsewhere can still be read back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Gender {
    Neutral,
    Male,
    Female,
}

impl Gender {
    /// Lowercase label as stored in the `gender` entry of the archive.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "neutral" => Some(Self::Neutral),
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }
}

/// Which world axis points up in a given convention.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum UpAxis {
    Y,
    Z,
}
