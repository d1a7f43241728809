use crate::directory::CourierDirectory;
use crate::engine::ledger::AssignmentLedger;
use crate::geo;
use crate::models::courier::{Courier, GeoPoint};

/// Couriers within `radius_m` of the drop-off, minus those already holding an
/// active assignment. An empty result is a normal outcome, not an error.
pub fn find_candidates(
    directory: &CourierDirectory,
    ledger: &AssignmentLedger,
    dropoff: &GeoPoint,
    radius_m: f64,
) -> Vec<Courier> {
    directory
        .snapshot()
        .into_iter()
        .filter(|courier| geo::within_radius(&courier.location, dropoff, radius_m))
        .filter(|courier| !ledger.is_busy(courier.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::find_candidates;
    use crate::directory::CourierDirectory;
    use crate::engine::ledger::AssignmentLedger;
    use crate::models::courier::{Courier, GeoPoint};

    fn courier(id_seed: u128, lat: f64, lng: f64) -> Courier {
        Courier {
            id: Uuid::from_u128(id_seed),
            full_name: "test-courier".to_string(),
            mobile: "0000000000".to_string(),
            location: GeoPoint { lat, lng },
            is_online: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn filters_by_radius() {
        let directory = CourierDirectory::new();
        let ledger = AssignmentLedger::new();

        let near = courier(1, 52.521, 13.406);
        // ~70km away
        let far = courier(2, 53.1, 13.9);
        directory.upsert(near.clone());
        directory.upsert(far);

        let dropoff = GeoPoint {
            lat: 52.52,
            lng: 13.405,
        };
        let candidates = find_candidates(&directory, &ledger, &dropoff, 5000.0);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, near.id);
    }

    #[test]
    fn excludes_couriers_holding_an_active_assignment() {
        let directory = CourierDirectory::new();
        let ledger = AssignmentLedger::new();

        let free = courier(1, 52.521, 13.406);
        let busy = courier(2, 52.522, 13.404);
        directory.upsert(free.clone());
        directory.upsert(busy.clone());

        let assignment = ledger
            .create(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), vec![busy.id])
            .unwrap();
        ledger.accept(assignment.id, busy.id).unwrap();

        let dropoff = GeoPoint {
            lat: 52.52,
            lng: 13.405,
        };
        let candidates = find_candidates(&directory, &ledger, &dropoff, 5000.0);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, free.id);
    }

    #[test]
    fn broadcasted_offers_do_not_make_a_courier_busy() {
        let directory = CourierDirectory::new();
        let ledger = AssignmentLedger::new();

        let offered = courier(1, 52.521, 13.406);
        directory.upsert(offered.clone());

        // offered but not yet accepted
        ledger
            .create(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), vec![offered.id])
            .unwrap();

        let dropoff = GeoPoint {
            lat: 52.52,
            lng: 13.405,
        };
        let candidates = find_candidates(&directory, &ledger, &dropoff, 5000.0);

        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn empty_directory_yields_empty_set() {
        let directory = CourierDirectory::new();
        let ledger = AssignmentLedger::new();

        let dropoff = GeoPoint {
            lat: 52.52,
            lng: 13.405,
        };
        assert!(find_candidates(&directory, &ledger, &dropoff, 5000.0).is_empty());
    }
}
