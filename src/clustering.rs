//! Proximity-agglomerative clustering of tourist spots
//!
//! Spots are sorted by id so the output is reproducible. A first pass seeds
//! each cluster at the spot with the most unclustered neighbours and grows it
//! around its moving centroid. Groups that end up below the minimum size are
//! set aside and get one more chance in a second pass, seeded in id order
//! around the fixed seed position; what still does not fit is dropped.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::RouteAiError;
use crate::geo;
use crate::models::{ClusterOptions, Coordinate, SpotCluster, TouristSpot};

/// Where candidate distances are measured from while a cluster grows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// Centroid of the members so far, recomputed after each addition
    Centroid,
    /// The seed spot only
    Seed,
}

/// Groups candidate spots into clusters bounded by [`ClusterOptions`]
pub struct GeographicClusterer;

impl GeographicClusterer {
    /// Partition `spots` into clusters; every spot lands in at most one.
    ///
    /// Clusters come back largest first, then closest to the centroid of all
    /// input spots first.
    pub fn cluster(spots: &[TouristSpot], options: &ClusterOptions) -> crate::Result<Vec<SpotCluster>> {
        options.validate()?;

        let mut sorted: Vec<&TouristSpot> = spots.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        sorted.dedup_by(|a, b| a.id == b.id);

        let coords: Vec<Coordinate> = sorted.iter().map(|s| s.coordinate).collect();
        let radius = options.proximity_radius_km;
        let neighbours = neighbour_lists(&coords, radius);

        let mut groups: Vec<Vec<usize>> = Vec::new();

        // first pass: densest seed, centroid-anchored growth
        let mut available = vec![true; coords.len()];
        let mut deferred: Vec<usize> = Vec::new();
        while let Some(seed) = densest_seed(&neighbours, &available) {
            let members = grow(&coords, &mut available, seed, options, Anchor::Centroid);
            if members.len() >= options.min_spots_per_cluster {
                groups.push(members);
            } else {
                deferred.extend(members);
            }
        }

        // second pass over what was set aside: id-ordered seeds, seed-anchored growth
        deferred.sort_unstable();
        let mut available = vec![false; coords.len()];
        for &i in &deferred {
            available[i] = true;
        }
        let mut dropped = 0usize;
        for &seed in &deferred {
            if !available[seed] {
                continue;
            }
            let members = grow(&coords, &mut available, seed, options, Anchor::Seed);
            if members.len() >= options.min_spots_per_cluster {
                groups.push(members);
            } else {
                // only the seed is given up; its neighbours may still seed a group
                for &other in &members[1..] {
                    available[other] = true;
                }
                dropped += 1;
            }
        }

        debug!(
            "Clustered {} spots into {} groups ({} set aside, {} dropped)",
            coords.len(),
            groups.len(),
            deferred.len(),
            dropped
        );

        if groups.is_empty() {
            return Err(RouteAiError::clustering(
                "no viable clusters formed",
                "widen proximity radius",
            ));
        }

        let search_centroid = geo::centroid(&coords).ok_or_else(|| {
            RouteAiError::clustering("clusters formed without any spots", "report this input")
        })?;

        let mut clusters: Vec<SpotCluster> = groups
            .into_iter()
            .filter_map(|members| {
                SpotCluster::from_spots(members.into_iter().map(|i| sorted[i].clone()).collect())
            })
            .collect();

        clusters.sort_by(|a, b| {
            b.spot_count()
                .cmp(&a.spot_count())
                .then_with(|| {
                    let da = geo::distance_km(&a.centroid(), &search_centroid);
                    let db = geo::distance_km(&b.centroid(), &search_centroid);
                    da.total_cmp(&db)
                })
                .then_with(|| first_id(a).cmp(first_id(b)))
        });

        Ok(clusters)
    }
}

fn first_id(cluster: &SpotCluster) -> &str {
    cluster.spots().first().map_or("", |s| s.id.as_str())
}

/// Pairwise neighbours within `radius_km`, computed once per run
fn neighbour_lists(coords: &[Coordinate], radius_km: f64) -> Vec<Vec<usize>> {
    let mut lists = vec![Vec::new(); coords.len()];
    for i in 0..coords.len() {
        for j in (i + 1)..coords.len() {
            if geo::distance_km(&coords[i], &coords[j]) <= radius_km {
                lists[i].push(j);
                lists[j].push(i);
            }
        }
    }
    lists
}

/// Available spot with the most available neighbours; lowest index wins ties
fn densest_seed(neighbours: &[Vec<usize>], available: &[bool]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, list) in neighbours.iter().enumerate() {
        if !available[i] {
            continue;
        }
        let count = list.iter().filter(|&&j| available[j]).count();
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((i, count));
        }
    }
    best.map(|(i, _)| i)
}

/// Grow a group from `seed`, taking the nearest eligible spot each step
fn grow(
    coords: &[Coordinate],
    available: &mut [bool],
    seed: usize,
    options: &ClusterOptions,
    anchor_mode: Anchor,
) -> Vec<usize> {
    let mut members = vec![seed];
    available[seed] = false;
    let mut anchor = coords[seed];

    while members.len() < options.max_spots_per_cluster {
        let next = (0..coords.len())
            .filter(|&j| available[j])
            .map(|j| (j, geo::distance_km(&anchor, &coords[j])))
            .filter(|&(_, d)| d <= options.proximity_radius_km)
            .min_by(|a, b| match a.1.total_cmp(&b.1) {
                Ordering::Equal => a.0.cmp(&b.0),
                other => other,
            });

        let Some((j, _)) = next else {
            break;
        };
        available[j] = false;
        members.push(j);

        if anchor_mode == Anchor::Centroid {
            let member_coords: Vec<Coordinate> = members.iter().map(|&m| coords[m]).collect();
            if let Some(centroid) = geo::centroid(&member_coords) {
                anchor = centroid;
            }
        }
    }

    members
}
