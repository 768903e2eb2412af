use crate::config::DispatchSettings;
use crate::error::DispatchError;
use crate::geo::{haversine_meters, travel_time_minutes};
use crate::models::candidate::RankedCandidate;
use crate::models::courier::GeoPoint;
use crate::stores::CourierDirectory;

/// Query the directory for eligible couriers and rank them against the
/// destination: available first, score descending, distance ascending,
/// stable on ties. Couriers beyond the search radius are dropped and the
/// result is capped. An empty pool is an ordinary empty result.
pub async fn select_candidates(
    directory: &dyn CourierDirectory,
    destination: &GeoPoint,
    settings: &DispatchSettings,
) -> Result<Vec<RankedCandidate>, DispatchError> {
    let couriers = directory
        .find_eligible()
        .await
        .map_err(|err| DispatchError::SelectionFailure(err.to_string()))?;

    let mut ranked: Vec<RankedCandidate> = couriers
        .iter()
        .filter(|courier| courier.approved && courier.available)
        .map(|courier| {
            let distance_m = haversine_meters(&courier.location, destination);
            RankedCandidate {
                courier_id: courier.id,
                available: courier.available,
                score: courier.score,
                distance_m,
                eta_minutes: travel_time_minutes(distance_m, settings.assumed_speed_kmh),
            }
        })
        .filter(|candidate| candidate.distance_m <= settings.search_radius_m)
        .collect();

    ranked.sort_by(|a, b| {
        b.available
            .cmp(&a.available)
            .then(b.score.total_cmp(&a.score))
            .then(a.distance_m.total_cmp(&b.distance_m))
    });
    ranked.truncate(settings.candidate_cap);

    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::select_candidates;
    use crate::config::DispatchSettings;
    use crate::models::courier::{Courier, GeoPoint};
    use crate::stores::memory::InMemoryDirectory;

    // Roughly 1 km of latitude.
    const LAT_PER_KM: f64 = 1.0 / 111.0;

    fn courier(id_seed: u128, offset_km: f64, score: f64, available: bool) -> Courier {
        Courier {
            id: Uuid::from_u128(id_seed),
            name: format!("courier-{id_seed}"),
            location: GeoPoint {
                lat: 53.5511 + offset_km * LAT_PER_KM,
                lng: 9.9937,
            },
            available,
            approved: true,
            score,
            last_seen_at: Utc::now(),
        }
    }

    fn destination() -> GeoPoint {
        GeoPoint {
            lat: 53.5511,
            lng: 9.9937,
        }
    }

    #[tokio::test]
    async fn ranks_by_score_then_distance() {
        let directory = InMemoryDirectory::new();
        // X: score 9 at ~2 km, Y: score 9 at ~1 km, Z: score 5 at ~0.5 km.
        directory.insert(courier(1, 2.0, 9.0, true));
        directory.insert(courier(2, 1.0, 9.0, true));
        directory.insert(courier(3, 0.5, 5.0, true));

        let ranked = select_candidates(&directory, &destination(), &DispatchSettings::default())
            .await
            .unwrap();

        let ids: Vec<u128> = ranked.iter().map(|c| c.courier_id.as_u128()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[tokio::test]
    async fn empty_pool_is_empty_result_not_error() {
        let directory = InMemoryDirectory::new();
        let ranked = select_candidates(&directory, &destination(), &DispatchSettings::default())
            .await
            .unwrap();
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn unavailable_and_unapproved_are_excluded() {
        let directory = InMemoryDirectory::new();
        directory.insert(courier(1, 1.0, 9.0, false));
        let mut unapproved = courier(2, 1.0, 9.0, true);
        unapproved.approved = false;
        directory.insert(unapproved);

        let ranked = select_candidates(&directory, &destination(), &DispatchSettings::default())
            .await
            .unwrap();
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn couriers_beyond_radius_are_dropped() {
        let directory = InMemoryDirectory::new();
        directory.insert(courier(1, 1.0, 5.0, true));
        directory.insert(courier(2, 20.0, 9.9, true));

        let ranked = select_candidates(&directory, &destination(), &DispatchSettings::default())
            .await
            .unwrap();

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].courier_id, Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn result_is_capped() {
        let directory = InMemoryDirectory::new();
        for seed in 0..10 {
            directory.insert(courier(seed as u128 + 1, 0.5, 5.0, true));
        }

        let settings = DispatchSettings {
            candidate_cap: 3,
            ..DispatchSettings::default()
        };
        let ranked = select_candidates(&directory, &destination(), &settings)
            .await
            .unwrap();
        assert_eq!(ranked.len(), 3);
    }

    #[tokio::test]
    async fn eta_reflects_distance() {
        let directory = InMemoryDirectory::new();
        directory.insert(courier(1, 2.0, 5.0, true));

        let ranked = select_candidates(&directory, &destination(), &DispatchSettings::default())
            .await
            .unwrap();

        // ~2 km at 20 km/h is about 6 minutes.
        assert!(ranked[0].eta_minutes >= 5 && ranked[0].eta_minutes <= 7);
    }
}
