//! Known integral quantities.

/// Integral identifiers understood by magnetostatic problems.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegralKind {
    MagneticEnergy,
    MagneticCoenergy,
    MaxwellForce,
    MaxwellTorque,
    FluxLinkage,
    LorentzForce,
}

impl IntegralKind {
    pub const ALL: [IntegralKind; 6] = [
        IntegralKind::MagneticEnergy,
        IntegralKind::MagneticCoenergy,
        IntegralKind::MaxwellForce,
        IntegralKind::MaxwellTorque,
        IntegralKind::FluxLinkage,
        IntegralKind::LorentzForce,
    ];

    pub fn id(self) -> i32 {
        match self {
            IntegralKind::MagneticEnergy => 13,
            IntegralKind::MagneticCoenergy => 14,
            IntegralKind::MaxwellForce => 15,
            IntegralKind::MaxwellTorque => 16,
            IntegralKind::FluxLinkage => 17,
            IntegralKind::LorentzForce => 23,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntegralKind::MagneticEnergy => "MagneticEnergy",
            IntegralKind::MagneticCoenergy => "MagneticCoenergy",
            IntegralKind::MaxwellForce => "MaxwellForce",
            IntegralKind::MaxwellTorque => "MaxwellTorque",
            IntegralKind::FluxLinkage => "FluxLinkage",
            IntegralKind::LorentzForce => "LorentzForce",
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// Case-insensitive name lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Default output name for an identifier: the known name or `Integral<id>`.
    pub fn output_name(id: i32) -> String {
        match Self::from_id(id) {
            Some(k) => k.name().to_string(),
            None => format!("Integral{id}"),
        }
    }
}
