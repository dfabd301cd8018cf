//! # Warehouse Rules
//!
//! Deliveries ("truckloads"), the pallets received on them, and the rules
//! applied when an operator scans a pallet in.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Delivery (truckload)                                                   │
//! │  ├── status: ACTIVE | PAUSED | COMPLETED                                │
//! │  └── pallets: 0..n                                                      │
//! │        Pallet                                                           │
//! │        ├── license_plate   (unique across ALL deliveries)               │
//! │        ├── location        (set → STORED, empty → RECEIVED)             │
//! │        └── pieces: 0..1                                                 │
//! │              Piece { part_number, description, quantity }               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage is somebody else's job. These functions take what the store
//! returned and decide; they never fetch.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::validation::{
    normalize_code, validate_license_plate, validate_location, validate_piece_count,
    ValidationResult,
};

/// Dashboard shows deliveries created within this many days.
pub const DASHBOARD_WINDOW_DAYS: i64 = 30;

// =============================================================================
// Delivery
// =============================================================================

/// Lifecycle of a truckload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    /// Being unloaded.
    #[default]
    Active,
    /// Unloading interrupted.
    Paused,
    /// Every pallet received.
    Completed,
}

impl DeliveryStatus {
    /// Dashboard sort rank: ACTIVE, then PAUSED, then COMPLETED.
    fn rank(&self) -> u8 {
        match self {
            DeliveryStatus::Active => 0,
            DeliveryStatus::Paused => 1,
            DeliveryStatus::Completed => 2,
        }
    }
}

/// A truckload being received.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: String,
    pub user_id: String,
    pub truck_number: Option<String>,
    /// Carrier PRO number, when the paperwork has one.
    pub pro_number: Option<String>,
    pub status: DeliveryStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub pallets: Vec<Pallet>,
}

impl Delivery {
    /// Opens a new, empty, ACTIVE delivery for `user_id`.
    pub fn new(user_id: impl Into<String>, truck_number: Option<String>, now: DateTime<Utc>) -> Self {
        Delivery {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            truck_number: truck_number.filter(|t| !t.trim().is_empty()),
            pro_number: None,
            status: DeliveryStatus::Active,
            created_at: now,
            pallets: Vec::new(),
        }
    }

    /// How the delivery is named in operator-facing messages.
    pub fn display_ref(&self) -> &str {
        self.pro_number.as_deref().unwrap_or(&self.id)
    }

    /// Pallets newest-scan first, the order the delivery screen lists them.
    pub fn pallets_by_scan_desc(&self) -> Vec<&Pallet> {
        let mut pallets: Vec<&Pallet> = self.pallets.iter().collect();
        pallets.sort_by(|a, b| b.scanned_at.cmp(&a.scanned_at));
        pallets
    }
}

// =============================================================================
// Pallet
// =============================================================================

/// Where a pallet is in the receiving flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PalletStatus {
    /// Off the truck, no location yet.
    Received,
    /// Put away at a location.
    Stored,
}

/// Status implied by a pallet's location.
pub fn pallet_status_for(location: Option<&str>) -> PalletStatus {
    match location {
        Some(loc) if !loc.trim().is_empty() => PalletStatus::Stored,
        _ => PalletStatus::Received,
    }
}

/// Part information attached to a pallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    pub id: String,
    pub pallet_id: String,
    pub part_number: String,
    pub description: String,
    pub quantity: Option<i64>,
}

/// A pallet received on a delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Pallet {
    pub id: String,
    pub delivery_id: String,
    pub license_plate: String,
    pub location: Option<String>,
    pub status: PalletStatus,
    pub piece_count: Option<i64>,
    #[ts(as = "String")]
    pub scanned_at: DateTime<Utc>,
    pub pieces: Vec<Piece>,
}

/// What the operator entered (or scanned) for a pallet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PalletInput {
    pub license_plate: String,
    pub location: Option<String>,
    pub part_number: Option<String>,
    pub part_description: Option<String>,
    pub piece_count: Option<i64>,
}

impl PalletInput {
    /// Validates and normalizes the input.
    ///
    /// ## Rules
    /// - license plate required, must pass the license-plate check
    /// - location optional; blank counts as absent
    /// - piece count, when present, must be positive
    pub fn validated(self) -> ValidationResult<PalletInput> {
        let license_plate = validate_license_plate(&self.license_plate)?;
        let location = validate_location(self.location.as_deref())?;
        validate_piece_count(self.piece_count)?;

        Ok(PalletInput {
            license_plate,
            location,
            part_number: non_blank(self.part_number).map(|p| normalize_code(&p)),
            part_description: non_blank(self.part_description).map(|d| d.trim().to_string()),
            piece_count: self.piece_count,
        })
    }

    /// Part info is recorded only when both number and description exist.
    fn piece_fields(&self) -> Option<(&str, &str)> {
        match (self.part_number.as_deref(), self.part_description.as_deref()) {
            (Some(number), Some(description)) => Some((number, description)),
            _ => None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Pallet {
    /// Builds a pallet for `delivery_id` from already-validated input.
    pub fn receive(delivery_id: &str, input: &PalletInput, now: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4().to_string();
        let pieces = input
            .piece_fields()
            .map(|(number, description)| {
                vec![Piece {
                    id: Uuid::new_v4().to_string(),
                    pallet_id: id.clone(),
                    part_number: number.to_string(),
                    description: description.to_string(),
                    quantity: input.piece_count,
                }]
            })
            .unwrap_or_default();

        Pallet {
            id,
            delivery_id: delivery_id.to_string(),
            license_plate: input.license_plate.clone(),
            location: input.location.clone(),
            status: pallet_status_for(input.location.as_deref()),
            piece_count: input.piece_count,
            scanned_at: now,
            pieces,
        }
    }

    /// Applies an edit. Location and piece count are replaced outright
    /// (absent clears them); the first piece is updated in place or created.
    pub fn apply(&mut self, input: &PalletInput) {
        self.license_plate = input.license_plate.clone();
        self.location = input.location.clone();
        self.status = pallet_status_for(input.location.as_deref());
        self.piece_count = input.piece_count;

        if let Some((number, description)) = input.piece_fields() {
            match self.pieces.first_mut() {
                Some(piece) => {
                    piece.part_number = number.to_string();
                    piece.description = description.to_string();
                    piece.quantity = input.piece_count;
                }
                None => self.pieces.push(Piece {
                    id: Uuid::new_v4().to_string(),
                    pallet_id: self.id.clone(),
                    part_number: number.to_string(),
                    description: description.to_string(),
                    quantity: input.piece_count,
                }),
            }
        }
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Fails if `license_plate` is already used by a pallet other than
/// `except_pallet`, naming the delivery that owns it.
pub fn ensure_license_plate_available(
    deliveries: &[Delivery],
    license_plate: &str,
    except_pallet: Option<&str>,
) -> CoreResult<()> {
    let owner = deliveries.iter().find(|delivery| {
        delivery.pallets.iter().any(|pallet| {
            pallet.license_plate == license_plate && Some(pallet.id.as_str()) != except_pallet
        })
    });

    match owner {
        Some(delivery) => Err(CoreError::DuplicateLicensePlate {
            license_plate: license_plate.to_string(),
            delivery: delivery.display_ref().to_string(),
        }),
        None => Ok(()),
    }
}

/// Validates `input` and adds a pallet to `delivery_id`.
///
/// `deliveries` must contain every delivery (the license-plate check spans
/// all of them, not only the caller's).
pub fn add_pallet(
    deliveries: &mut [Delivery],
    delivery_id: &str,
    input: PalletInput,
    now: DateTime<Utc>,
) -> CoreResult<Pallet> {
    let input = input.validated()?;
    ensure_license_plate_available(deliveries, &input.license_plate, None)?;

    let delivery = deliveries
        .iter_mut()
        .find(|d| d.id == delivery_id)
        .ok_or_else(|| CoreError::DeliveryNotFound(delivery_id.to_string()))?;

    let pallet = Pallet::receive(delivery_id, &input, now);
    delivery.pallets.push(pallet.clone());
    Ok(pallet)
}

/// Validates `input` and applies it to an existing pallet.
pub fn update_pallet(
    deliveries: &mut [Delivery],
    pallet_id: &str,
    input: PalletInput,
) -> CoreResult<Pallet> {
    let input = input.validated()?;
    ensure_license_plate_available(deliveries, &input.license_plate, Some(pallet_id))?;

    let pallet = deliveries
        .iter_mut()
        .flat_map(|d| d.pallets.iter_mut())
        .find(|p| p.id == pallet_id)
        .ok_or_else(|| CoreError::PalletNotFound(pallet_id.to_string()))?;

    pallet.apply(&input);
    Ok(pallet.clone())
}

/// Deliveries for the dashboard: `user_id`'s deliveries from the last
/// [`DASHBOARD_WINDOW_DAYS`] days, ACTIVE first, newest first per status.
pub fn dashboard_deliveries<'a>(
    deliveries: &'a [Delivery],
    user_id: &str,
    now: DateTime<Utc>,
) -> Vec<&'a Delivery> {
    let cutoff = now - Duration::days(DASHBOARD_WINDOW_DAYS);

    let mut listed: Vec<&Delivery> = deliveries
        .iter()
        .filter(|d| d.user_id == user_id && d.created_at >= cutoff)
        .collect();

    listed.sort_by(|a, b| {
        a.status
            .rank()
            .cmp(&b.status.rank())
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    listed
}

/// Only the ACTIVE entries of [`dashboard_deliveries`].
pub fn active_deliveries<'a>(
    deliveries: &'a [Delivery],
    user_id: &str,
    now: DateTime<Utc>,
) -> Vec<&'a Delivery> {
    dashboard_deliveries(deliveries, user_id, now)
        .into_iter()
        .filter(|d| d.status == DeliveryStatus::Active)
        .collect()
}

/// Looks up a delivery the caller owns.
pub fn owned_delivery<'a>(
    deliveries: &'a [Delivery],
    delivery_id: &str,
    user_id: &str,
) -> CoreResult<&'a Delivery> {
    deliveries
        .iter()
        .find(|d| d.id == delivery_id && d.user_id == user_id)
        .ok_or_else(|| CoreError::DeliveryNotFound(delivery_id.to_string()))
}
