//! Numeric code tables used by the Nagios status and object files.

use serde::Serialize;

use crate::error::FieldProblem;

fn integer_code(value: &str) -> Result<i64, FieldProblem> {
    value
        .trim()
        .parse()
        .map_err(|_| FieldProblem::invalid("an integer code", value))
}

/// Service check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    #[default]
    Unknown,
}

impl ServiceState {
    /// 0/1/2 map to ok/warning/critical, any other integer is unknown.
    pub fn from_code(value: &str) -> Result<Self, FieldProblem> {
        Ok(match integer_code(value)? {
            0 => ServiceState::Ok,
            1 => ServiceState::Warning,
            2 => ServiceState::Critical,
            _ => ServiceState::Unknown,
        })
    }
}

/// Host reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    #[default]
    Up,
    Down,
    Unreachable,
}

impl HostState {
    pub fn from_code(value: &str) -> Result<Self, FieldProblem> {
        match integer_code(value)? {
            0 => Ok(HostState::Up),
            1 => Ok(HostState::Down),
            2 => Ok(HostState::Unreachable),
            _ => Err(FieldProblem::invalid("a host state (0, 1 or 2)", value)),
        }
    }
}

/// Whether a state has been confirmed by repeated checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateType {
    #[default]
    Soft,
    Hard,
}

impl StateType {
    pub fn from_code(value: &str) -> Result<Self, FieldProblem> {
        match integer_code(value)? {
            0 => Ok(StateType::Soft),
            1 => Ok(StateType::Hard),
            _ => Err(FieldProblem::invalid("a state type (0 or 1)", value)),
        }
    }

    pub fn is_hard(&self) -> bool {
        matches!(self, StateType::Hard)
    }
}

/// How the last check was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    #[default]
    Active,
    Passive,
    Parent,
    File,
    Other,
}

impl CheckType {
    pub fn from_code(value: &str) -> Result<Self, FieldProblem> {
        Ok(match integer_code(value)? {
            0 => CheckType::Active,
            1 => CheckType::Passive,
            2 => CheckType::Parent,
            3 => CheckType::File,
            _ => CheckType::Other,
        })
    }
}

/// Bit set of options applied to the next scheduled check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CheckOptions(u32);

impl CheckOptions {
    pub const NONE: CheckOptions = CheckOptions(0);
    pub const FORCE_EXECUTION: CheckOptions = CheckOptions(1);
    pub const FRESHNESS_CHECK: CheckOptions = CheckOptions(2);
    pub const ORPHAN_CHECK: CheckOptions = CheckOptions(4);
    pub const DEPENDENCY_CHECK: CheckOptions = CheckOptions(8);

    pub fn from_code(value: &str) -> Result<Self, FieldProblem> {
        value
            .trim()
            .parse()
            .map(CheckOptions)
            .map_err(|_| FieldProblem::invalid("a check option bit set", value))
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: CheckOptions) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// How a problem was acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AcknowledgementType {
    #[default]
    None,
    Normal,
    Sticky,
}

impl AcknowledgementType {
    pub fn from_code(value: &str) -> Result<Self, FieldProblem> {
        Ok(match integer_code(value)? {
            0 => AcknowledgementType::None,
            1 => AcknowledgementType::Normal,
            _ => AcknowledgementType::Sticky,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_state_codes() {
        assert_eq!(ServiceState::from_code("0"), Ok(ServiceState::Ok));
        assert_eq!(ServiceState::from_code("1"), Ok(ServiceState::Warning));
        assert_eq!(ServiceState::from_code("2"), Ok(ServiceState::Critical));
        assert_eq!(ServiceState::from_code("3"), Ok(ServiceState::Unknown));
        assert_eq!(ServiceState::from_code("17"), Ok(ServiceState::Unknown));
        assert!(ServiceState::from_code("ok").is_err());
    }

    #[test]
    fn test_host_state_codes() {
        assert_eq!(HostState::from_code("0"), Ok(HostState::Up));
        assert_eq!(HostState::from_code("1"), Ok(HostState::Down));
        assert_eq!(HostState::from_code("2"), Ok(HostState::Unreachable));
        assert!(HostState::from_code("3").is_err());
    }

    #[test]
    fn test_state_type_codes() {
        assert_eq!(StateType::from_code("0"), Ok(StateType::Soft));
        assert_eq!(StateType::from_code("1"), Ok(StateType::Hard));
        assert!(StateType::from_code("2").is_err());
        assert!(StateType::Hard.is_hard());
    }

    #[test]
    fn test_check_type_codes() {
        assert_eq!(CheckType::from_code("0"), Ok(CheckType::Active));
        assert_eq!(CheckType::from_code("3"), Ok(CheckType::File));
        assert_eq!(CheckType::from_code("9"), Ok(CheckType::Other));
    }

    #[test]
    fn test_check_options_bits() {
        let options = CheckOptions::from_code("10").unwrap();
        assert!(options.contains(CheckOptions::FRESHNESS_CHECK));
        assert!(options.contains(CheckOptions::DEPENDENCY_CHECK));
        assert!(!options.contains(CheckOptions::FORCE_EXECUTION));
        assert!(!options.contains(CheckOptions::NONE));
        assert!(CheckOptions::from_code("0").unwrap().is_empty());
        assert!(CheckOptions::from_code("-1").is_err());
    }

    #[test]
    fn test_acknowledgement_codes() {
        assert_eq!(AcknowledgementType::from_code("0"), Ok(AcknowledgementType::None));
        assert_eq!(AcknowledgementType::from_code("1"), Ok(AcknowledgementType::Normal));
        assert_eq!(AcknowledgementType::from_code("2"), Ok(AcknowledgementType::Sticky));
    }
}
