// ============================================================
// Layer 5: Optimizer Selection
// ============================================================
// The optimizer is chosen by name on the command line and
// stored in config.json. Each kind maps onto a Burn optimizer
// config in `trainer::train_on_device`:
//
//   adam     → AdamConfig     (ε = 1e-8)
//   sgd      → SgdConfig
//   rmsprop  → RmsPropConfig
//   adagrad  → AdaGradConfig

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
    RmsProp,
    AdaGrad,
}

impl FromStr for OptimizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "adam" => Ok(Self::Adam),
            "sgd" => Ok(Self::Sgd),
            "rmsprop" => Ok(Self::RmsProp),
            "adagrad" => Ok(Self::AdaGrad),
            _ => Err(format!(
                "unknown optimizer: {s:?} (expected adam, sgd, rmsprop or adagrad)"
            )),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Adam => "adam",
            Self::Sgd => "sgd",
            Self::RmsProp => "rmsprop",
            Self::AdaGrad => "adagrad",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_display() {
        for kind in [OptimizerKind::Adam, OptimizerKind::Sgd, OptimizerKind::RmsProp, OptimizerKind::AdaGrad] {
            assert_eq!(kind.to_string().parse::<OptimizerKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&OptimizerKind::RmsProp).unwrap();
        assert_eq!(json, "\"rmsprop\"");
        let back: OptimizerKind = serde_json::from_str("\"adagrad\"").unwrap();
        assert_eq!(back, OptimizerKind::AdaGrad);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        assert!("lbfgs".parse::<OptimizerKind>().is_err());
    }
}
