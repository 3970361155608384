//! # Split Module
//!
//! The split/pricing calculator shared by every place that deals with a
//! charge amount: service configuration, charge quotes, charge creation and
//! the despachante-facing split preview.
//!
//! ## How a Charge is Split
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Charge amount: R$ 60,00                                                │
//! │                                                                         │
//! │  ├── ACSM            R$  6,00  ┐                                        │
//! │  ├── ICETRAN         R$  6,00  ├── minimum_charge = R$ 15,50            │
//! │  ├── Taxa cobrança   R$  3,50  ┘                                        │
//! │  └── Despachante     R$ 44,50  ◄── margin = max(0, amount - minimum)    │
//! │                                                                         │
//! │  viable = amount >= minimum_charge                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The calculator never fails. Deciding what to do with an inviable amount
//! belongs to [`ViabilityPolicy`], applied by whoever persists the charge.
//!
//! ## Usage
//! ```rust
//! use multas_core::money::Money;
//! use multas_core::split::{margin, minimum_charge, is_viable, SplitConfig};
//!
//! let cfg = SplitConfig::STANDARD;
//! assert_eq!(minimum_charge(&cfg).cents(), 1550);
//!
//! let amount = Money::from_cents(6000);
//! assert_eq!(margin(amount, &cfg).cents(), 4450);
//! assert!(is_viable(amount, &cfg));
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{validate_split_component, ValidationResult};

// =============================================================================
// Split Configuration
// =============================================================================

/// The three fixed components of a service's split.
///
/// Stored as columns of the service record and read-only for the
/// calculator. Every component is zero or greater.
///
/// Not `Deserialize`: construct through [`SplitConfig::new`] so the
/// invariant is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[ts(export)]
pub struct SplitConfig {
    /// Fixed amount routed to ACSM per charge.
    acsm_value: Money,

    /// Fixed amount routed to ICETRAN per charge.
    icetran_value: Money,

    /// Fixed processing/operational fee.
    taxa_cobranca: Money,
}

impl SplitConfig {
    /// Default split used by new services: R$ 6,00 / R$ 6,00 / R$ 3,50.
    pub const STANDARD: SplitConfig = SplitConfig::from_cents(600, 600, 350);

    /// Split used by capital-city services: R$ 11,00 / R$ 11,00 / R$ 3,50.
    pub const CAPITAL: SplitConfig = SplitConfig::from_cents(1100, 1100, 350);

    /// No fixed costs: the whole amount is margin.
    pub const ZERO: SplitConfig = SplitConfig::from_cents(0, 0, 0);

    /// Creates a split configuration, rejecting negative components.
    ///
    /// ## Example
    /// ```rust
    /// use multas_core::money::Money;
    /// use multas_core::split::SplitConfig;
    ///
    /// let cfg = SplitConfig::new(
    ///     Money::from_cents(600),
    ///     Money::from_cents(600),
    ///     Money::from_cents(350),
    /// ).unwrap();
    /// assert_eq!(cfg, SplitConfig::STANDARD);
    ///
    /// assert!(SplitConfig::new(Money::from_cents(-1), Money::zero(), Money::zero()).is_err());
    /// ```
    pub fn new(
        acsm_value: Money,
        icetran_value: Money,
        taxa_cobranca: Money,
    ) -> ValidationResult<Self> {
        validate_split_component("acsm_value", acsm_value)?;
        validate_split_component("icetran_value", icetran_value)?;
        validate_split_component("taxa_cobranca", taxa_cobranca)?;

        Ok(SplitConfig {
            acsm_value,
            icetran_value,
            taxa_cobranca,
        })
    }

    /// Builds a configuration from centavos without validation.
    ///
    /// Only for compile-time presets; negative inputs are clamped to zero so
    /// the non-negative invariant still holds.
    pub const fn from_cents(acsm_cents: i64, icetran_cents: i64, taxa_cents: i64) -> Self {
        SplitConfig {
            acsm_value: Money::from_cents(acsm_cents).clamp_non_negative(),
            icetran_value: Money::from_cents(icetran_cents).clamp_non_negative(),
            taxa_cobranca: Money::from_cents(taxa_cents).clamp_non_negative(),
        }
    }

    /// Builds a configuration from raw form inputs.
    ///
    /// Each input goes through [`Money::parse_lenient`] (unparseable input is
    /// zero) and negative values are clamped to zero. Used by the split
    /// preview, which must render something for every keystroke.
    pub fn from_lenient_inputs(acsm: &str, icetran: &str, taxa: &str) -> Self {
        SplitConfig {
            acsm_value: Money::parse_lenient(acsm).clamp_non_negative(),
            icetran_value: Money::parse_lenient(icetran).clamp_non_negative(),
            taxa_cobranca: Money::parse_lenient(taxa).clamp_non_negative(),
        }
    }

    #[inline]
    pub const fn acsm_value(&self) -> Money {
        self.acsm_value
    }

    #[inline]
    pub const fn icetran_value(&self) -> Money {
        self.icetran_value
    }

    #[inline]
    pub const fn taxa_cobranca(&self) -> Money {
        self.taxa_cobranca
    }

    /// `acsm_value + icetran_value + taxa_cobranca`.
    ///
    /// Saturates at `i64::MAX` centavos, so an oversized lenient preview
    /// input can never wrap into a negative minimum.
    #[inline]
    pub fn minimum_charge(&self) -> Money {
        self.acsm_value
            .saturating_add(self.icetran_value)
            .saturating_add(self.taxa_cobranca)
    }

    /// `max(0, amount - minimum_charge)`: what the despachante keeps.
    #[inline]
    pub fn margin(&self, amount: Money) -> Money {
        amount.saturating_sub(self.minimum_charge())
    }

    /// `amount >= minimum_charge`.
    #[inline]
    pub fn is_viable(&self, amount: Money) -> bool {
        amount >= self.minimum_charge()
    }

    /// How much is missing to reach the minimum (zero when viable).
    #[inline]
    pub fn shortfall(&self, amount: Money) -> Money {
        self.minimum_charge().saturating_sub(amount)
    }

    /// Computes the full breakdown of `amount` under this split.
    pub fn quote(&self, amount: Money) -> SplitQuote {
        SplitQuote {
            amount,
            acsm_value: self.acsm_value,
            icetran_value: self.icetran_value,
            taxa_cobranca: self.taxa_cobranca,
            minimum_charge: self.minimum_charge(),
            margin: self.margin(amount),
            shortfall: self.shortfall(amount),
            viable: self.is_viable(amount),
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        SplitConfig::STANDARD
    }
}

// =============================================================================
// Calculator Functions
// =============================================================================

/// Minimum-cost calculator: the floor price of a charge under `cfg`.
#[inline]
pub fn minimum_charge(cfg: &SplitConfig) -> Money {
    cfg.minimum_charge()
}

/// Margin calculator: the despachante's share, never negative.
#[inline]
pub fn margin(amount: Money, cfg: &SplitConfig) -> Money {
    cfg.margin(amount)
}

/// Viability predicate: whether `amount` covers the fixed components.
#[inline]
pub fn is_viable(amount: Money, cfg: &SplitConfig) -> bool {
    cfg.is_viable(amount)
}

// =============================================================================
// Split Quote
// =============================================================================

/// Breakdown of one charge amount, as shown to the operator before the
/// charge is submitted and as snapshotted on the charge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitQuote {
    pub amount: Money,
    pub acsm_value: Money,
    pub icetran_value: Money,
    pub taxa_cobranca: Money,
    pub minimum_charge: Money,
    pub margin: Money,
    pub shortfall: Money,
    pub viable: bool,
}

impl SplitQuote {
    /// Margin as basis points of the amount (4450 / 6000 → 7416 bps).
    ///
    /// Zero when the amount is zero or negative.
    pub fn margin_bps(&self) -> i64 {
        if !self.amount.is_positive() {
            return 0;
        }
        (self.margin.cents() as i128 * 10_000 / self.amount.cents() as i128) as i64
    }
}

// =============================================================================
// Viability Policy
// =============================================================================

/// What the charge boundary does with an inviable quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ViabilityPolicy {
    /// Reject charges below the minimum.
    #[default]
    Enforce,
    /// Accept them; the charge is flagged `below_minimum`.
    Advisory,
}

impl ViabilityPolicy {
    /// Applies the policy to a quote.
    ///
    /// ## Example
    /// ```rust
    /// use multas_core::money::Money;
    /// use multas_core::split::{SplitConfig, ViabilityPolicy};
    ///
    /// let quote = SplitConfig::STANDARD.quote(Money::from_cents(1000));
    /// assert!(ViabilityPolicy::Enforce.check(&quote).is_err());
    /// assert!(ViabilityPolicy::Advisory.check(&quote).is_ok());
    /// ```
    pub fn check(&self, quote: &SplitQuote) -> CoreResult<()> {
        match self {
            ViabilityPolicy::Enforce if !quote.viable => Err(CoreError::BelowMinimumCharge {
                amount: quote.amount,
                minimum: quote.minimum_charge,
            }),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
