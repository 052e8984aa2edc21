//! Perfume catalog entities

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One purchasable size of a perfume.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variant {
    pub volume: i32,
    pub price: Decimal,
    pub stock: i32,
    pub active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Perfume {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub description: Option<String>,
    pub active: bool,
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
}

impl Perfume {
    /// Look up the active variant sold at exactly this volume.
    pub fn variant(&self, volume: i32) -> Option<&Variant> {
        self.variants.iter().find(|v| v.volume == volume && v.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perfume_with(volumes: &[i32]) -> Perfume {
        Perfume {
            id: Uuid::new_v4(),
            name: "Oud Royale".into(),
            brand: "Maison Test".into(),
            description: None,
            active: true,
            variants: volumes
                .iter()
                .map(|&v| Variant { volume: v, price: Decimal::new(5000, 2), stock: 10, active: true })
                .collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn variant_lookup_is_exact() {
        let p = perfume_with(&[50, 100]);
        assert!(p.variant(50).is_some());
        assert!(p.variant(75).is_none());
    }

    #[test]
    fn inactive_variants_are_not_sold() {
        let mut p = perfume_with(&[50]);
        p.variants[0].active = false;
        assert!(p.variant(50).is_none());
    }
}
