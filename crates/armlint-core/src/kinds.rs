//! Document kinds a rule applies to

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::CoreError;

bitflags! {
    /// Bitmask of API description flavors. A rule runs when its mask
    /// intersects the kind requested for the run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpecKinds: u8 {
        const DEFAULT = 0b0001;
        const ARM = 0b0010;
        const DATA_PLANE = 0b0100;
        const RPAAS = 0b1000;
    }
}

impl Default for SpecKinds {
    fn default() -> Self {
        SpecKinds::DEFAULT
    }
}

impl FromStr for SpecKinds {
    type Err = CoreError;

    /// Accepts `arm`, `data-plane`, `default`, `rpaas`, or several joined with `,` or `|`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut kinds = SpecKinds::empty();
        for part in s.split([',', '|']).map(str::trim).filter(|p| !p.is_empty()) {
            kinds |= match part.to_ascii_lowercase().as_str() {
                "default" => SpecKinds::DEFAULT,
                "arm" => SpecKinds::ARM,
                "data-plane" | "dataplane" | "data_plane" => SpecKinds::DATA_PLANE,
                "rpaas" => SpecKinds::RPAAS,
                _ => return Err(CoreError::UnknownSpecKind(part.to_string())),
            };
        }
        if kinds.is_empty() {
            return Err(CoreError::UnknownSpecKind(s.to_string()));
        }
        Ok(kinds)
    }
}

impl fmt::Display for SpecKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (SpecKinds::DEFAULT, "default"),
            (SpecKinds::ARM, "arm"),
            (SpecKinds::DATA_PLANE, "data-plane"),
            (SpecKinds::RPAAS, "rpaas"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        f.write_str(&names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!("arm".parse::<SpecKinds>().unwrap(), SpecKinds::ARM);
        assert_eq!(
            "ARM, data-plane".parse::<SpecKinds>().unwrap(),
            SpecKinds::ARM | SpecKinds::DATA_PLANE
        );
        assert!("cloud".parse::<SpecKinds>().is_err());
        assert!("".parse::<SpecKinds>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let kinds = SpecKinds::DEFAULT | SpecKinds::RPAAS;
        assert_eq!(kinds.to_string(), "default,rpaas");
        assert_eq!(kinds.to_string().parse::<SpecKinds>().unwrap(), kinds);
    }
}
