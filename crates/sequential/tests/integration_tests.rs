//! Integration tests for seqarrange-sequential.

use seqarrange_core::{BoundingBox, Error, Point, Polygon, Rational, ScheduledPlate, SolvedPlate};
use seqarrange_sequential::check::{plate_conflict, CheckedObject};
use seqarrange_sequential::{
    check_scheduled_objects_for_sequential_conflict,
    check_scheduled_objects_for_sequential_printability, schedule_objects_for_sequential_print,
    schedule_solvable_objects, BoundingSearch, LineEncoding, ObjectToPrint, PlateBounds,
    PrinterGeometry, SolvableObject, SolverConfiguration,
};

const MM: i64 = 1_000_000;

fn rect(x0: i64, y0: i64, x1: i64, y1: i64) -> Polygon {
    Polygon::rectangle(Point::new(x0, y0), Point::new(x1, y1))
}

/// MK3S-like printer: 250 x 210 mm plate, nozzle, extruder body, hose and
/// gantry levels.
fn mk3s_printer() -> PrinterGeometry {
    PrinterGeometry::new(rect(0, 0, 250 * MM, 210 * MM))
        .with_convex_slice(0, vec![rect(-MM / 2, -MM / 2, MM / 2, MM / 2)])
        .with_convex_slice(3 * MM, vec![rect(-20 * MM, -10 * MM, 20 * MM, 30 * MM)])
        .with_convex_slice(11 * MM, vec![rect(-26 * MM, 5 * MM, -16 * MM, 45 * MM)])
        .with_box_slice(22 * MM, vec![rect(-350 * MM, -4 * MM, 350 * MM, 4 * MM)])
}

/// A cube slightly shorter than the hose level.
fn cube(id: i32, side_mm: i64) -> ObjectToPrint {
    let half = side_mm * MM / 2;
    let slice = rect(-half, -half, half, half);
    ObjectToPrint::new(id, 10 * MM, vec![(0, slice.clone()), (3 * MM, slice)])
}

/// Solver-unit object with a square footprint and an offset zone.
fn solvable(id: i32, half: i64) -> SolvableObject {
    SolvableObject::new(id, rect(-half, -half, half, half))
        .with_unreachable(vec![rect(-half - 200, -half - 100, half + 200, half + 300)])
}

/// Footprint of 1200 x 1800 whose zone rules out a second one on the default
/// plate.
fn big(id: i32) -> SolvableObject {
    SolvableObject::new(id, rect(-600, -900, 600, 900)).with_unreachable(vec![rect(-900, -1000, 900, 1000)])
}

fn checked<'a>(objects: &'a [SolvableObject], plate: &SolvedPlate) -> Vec<CheckedObject<'a>> {
    plate
        .objects
        .iter()
        .enumerate()
        .map(|(k, o)| CheckedObject {
            object: objects.iter().find(|s| s.id == o.id).expect("known object"),
            position: (o.x.as_f64(), o.y.as_f64()),
            t: k as i64,
        })
        .collect()
}

mod scheduling_tests {
    use super::*;

    #[test]
    fn test_four_objects_on_one_plate() {
        let config = SolverConfiguration::default();
        let objects: Vec<SolvableObject> = (1..=4).map(|id| solvable(id, 100)).collect();
        let mut progress = Vec::new();

        let plates = schedule_solvable_objects(&config, &objects, |p| progress.push(p)).unwrap();
        assert_eq!(plates.len(), 1);

        let mut ids = plates[0].ids();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(plate_conflict(&checked(&objects, &plates[0])), None);

        assert_eq!(progress.last(), Some(&100));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_temporal_spread_on_plate() {
        let config = SolverConfiguration::default();
        let objects: Vec<SolvableObject> = (1..=3).map(|id| solvable(id, 80)).collect();
        let plates = schedule_solvable_objects(&config, &objects, |_| {}).unwrap();

        for plate in &plates {
            for w in plate.objects.windows(2) {
                let gap = (w[1].t - w[0].t).as_f64();
                assert!(gap >= config.temporal_spread as f64, "gap {}", gap);
            }
        }
    }

    #[test]
    fn test_objects_stay_on_plate() {
        let config = SolverConfiguration::default();
        let objects: Vec<SolvableObject> = (1..=4).map(|id| solvable(id, 150)).collect();
        let plates = schedule_solvable_objects(&config, &objects, |_| {}).unwrap();
        let plate = config.plate.bounding_box();

        for solved in plates.iter().flat_map(|p| &p.objects) {
            let object = objects.iter().find(|o| o.id == solved.id).unwrap();
            let ext = object.extents().unwrap();
            let x = solved.x.as_f64();
            let y = solved.y.as_f64();
            assert!(x + ext.min.x as f64 >= plate.min.x as f64 - 1e-6);
            assert!(x + ext.max.x as f64 <= plate.max.x as f64 + 1e-6);
            assert!(y + ext.min.y as f64 >= plate.min.y as f64 - 1e-6);
            assert!(y + ext.max.y as f64 <= plate.max.y as f64 + 1e-6);
        }
    }

    #[test]
    fn test_overflow_goes_to_second_plate() {
        // Two footprints of 1200 x 1800 cannot share a 2500 x 2100 plate once
        // their zones are taken into account.
        let config = SolverConfiguration::default();
        let objects = vec![big(1), big(2)];
        let plates = schedule_solvable_objects(&config, &objects, |_| {}).unwrap();
        assert_eq!(plates.len(), 2);
        assert_eq!(plates[0].ids(), vec![1]);
        assert_eq!(plates[1].ids(), vec![2]);
    }

    #[test]
    fn test_polygon_plate() {
        let octagon = Polygon::from_coords(&[
            (500, 0),
            (1500, 0),
            (2000, 500),
            (2000, 1500),
            (1500, 2000),
            (500, 2000),
            (0, 1500),
            (0, 500),
        ]);
        let config = SolverConfiguration::default().with_plate(PlateBounds::Polygon(octagon.clone()));
        let objects: Vec<SolvableObject> = (1..=2).map(|id| solvable(id, 100)).collect();
        let plates = schedule_solvable_objects(&config, &objects, |_| {}).unwrap();
        assert_eq!(plates.len(), 1);

        let outline: Vec<(f64, f64)> = octagon.points().iter().map(|p| p.as_f64()).collect();
        for solved in &plates[0].objects {
            let object = objects.iter().find(|o| o.id == solved.id).unwrap();
            for v in object.polygon.points() {
                let p = (v.x as f64 + solved.x.as_f64(), v.y as f64 + solved.y.as_f64());
                for i in 0..outline.len() {
                    let (q, r) = (outline[i], outline[(i + 1) % outline.len()]);
                    let side = (r.0 - q.0) * (p.1 - q.1) - (r.1 - q.1) * (p.0 - q.0);
                    let norm = (r.0 - q.0).abs().max((r.1 - q.1).abs());
                    assert!(side / norm >= -1e-3, "vertex {:?} of object {} leaves the plate", p, solved.id);
                }
            }
        }
    }
}

mod glue_tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_glued_pair_is_adjacent() {
        let config = SolverConfiguration::default();
        let objects = vec![
            solvable(1, 80).glued(true),
            solvable(2, 80),
            solvable(3, 80),
        ];
        let plates = schedule_solvable_objects(&config, &objects, |_| {}).unwrap();
        assert_eq!(plates.len(), 1);

        let plate = &plates[0].objects;
        let first = plate.iter().position(|o| o.id == 1).unwrap();
        assert_eq!(plate[first + 1].id, 2);

        let gap = (plate[first + 1].t - plate[first].t).as_f64();
        let spread = config.temporal_spread as f64;
        assert!(gap >= spread && gap <= 1.5 * spread, "gap {}", gap);
        assert_relative_eq!(gap, 1.25 * spread);
    }
}

mod split_glue_tests {
    use super::*;

    #[test]
    fn test_glued_pair_split_across_plates() {
        // Objects 1 and 3 never share a plate, so the glued pair 2-3 is split.
        let config = SolverConfiguration::default();
        let objects = vec![big(1), solvable(2, 100).glued(true), big(3)];
        let plates = schedule_solvable_objects(&config, &objects, |_| {}).unwrap();

        assert_eq!(plates.len(), 2);
        assert_eq!(plates[0].ids(), vec![1, 2]);
        assert_eq!(plates[1].ids(), vec![3]);
        for plate in &plates {
            assert_eq!(plate_conflict(&checked(&objects, plate)), None);
        }
    }

    #[test]
    fn test_split_successor_opens_next_plate() {
        let config = SolverConfiguration::default();
        let objects = vec![
            big(1),
            solvable(2, 100).glued(true),
            big(3),
            solvable(4, 100),
            solvable(5, 100),
        ];
        let plates = schedule_solvable_objects(&config, &objects, |_| {}).unwrap();

        // The glued object closes its plate and its successor opens the next.
        let first = plates.iter().position(|p| p.ids().contains(&2)).unwrap();
        assert_eq!(plates[first].ids().last(), Some(&2));
        assert_eq!(plates[first + 1].ids().first(), Some(&3));

        let next = &plates[first + 1].objects;
        for later in &next[1..] {
            assert!((later.t - next[0].t).as_f64() > config.temporal_spread as f64);
        }
        for plate in &plates {
            assert_eq!(plate_conflict(&checked(&objects, plate)), None);
        }
    }
}

mod proxy_tests {
    use super::*;

    #[test]
    fn test_decided_objects_coalesce_into_proxy() {
        let config = SolverConfiguration::default()
            .with_object_group_size(1)
            .with_fixed_object_grouping_limit(1)
            .with_max_refines(4);
        let objects: Vec<SolvableObject> = (1..=5).map(|id| solvable(id, 60)).collect();
        let plates = schedule_solvable_objects(&config, &objects, |_| {}).unwrap();

        assert_eq!(plates.len(), 1);
        // From the third batch on, new objects follow the proxy.
        assert_eq!(&plates[0].ids()[2..], &[3, 4, 5]);
        assert_eq!(plate_conflict(&checked(&objects, &plates[0])), None);

        // 32 + (k + 1) * 2 * 16 * 1
        for (k, solved) in plates[0].objects.iter().enumerate() {
            assert_eq!(solved.t, Rational::from_integer(64 + 32 * k as i64));
        }
    }
}

mod encoding_tests {
    use super::*;

    /// Thin vertical footprint with a thin horizontal zone: vertex
    /// separation alone admits crossing arrangements.
    fn bar(id: i32) -> SolvableObject {
        SolvableObject::new(id, rect(-10, -300, 10, 300)).with_unreachable(vec![rect(-300, -10, 300, 10)])
    }

    fn schedule_bars(encoding: LineEncoding) -> (Vec<SolvableObject>, Vec<SolvedPlate>) {
        let config = SolverConfiguration::default().with_line_encoding(encoding);
        let objects: Vec<SolvableObject> = (1..=3).map(bar).collect();
        let plates = schedule_solvable_objects(&config, &objects, |_| {}).unwrap();
        (objects, plates)
    }

    #[test]
    fn test_implicit_line_encoding() {
        let (objects, plates) = schedule_bars(LineEncoding::Implicit);
        assert_eq!(plates.len(), 1);
        assert_eq!(plate_conflict(&checked(&objects, &plates[0])), None);
    }

    #[test]
    fn test_explicit_line_encoding() {
        let (objects, plates) = schedule_bars(LineEncoding::Explicit);
        assert_eq!(plates.len(), 1);
        assert_eq!(plate_conflict(&checked(&objects, &plates[0])), None);
    }

    #[test]
    fn test_linear_bounding_search() {
        let config = SolverConfiguration::default()
            .with_plate(PlateBounds::Box(BoundingBox::new(Point::new(0, 0), Point::new(600, 600))))
            .with_bounding_search(BoundingSearch::Linear)
            .with_optimization_step(50);
        let objects: Vec<SolvableObject> = (1..=2).map(|id| solvable(id, 40)).collect();
        let plates = schedule_solvable_objects(&config, &objects, |_| {}).unwrap();

        assert_eq!(plates.len(), 1);
        assert_eq!(plates[0].ids(), vec![1, 2]);
        assert_eq!(plate_conflict(&checked(&objects, &plates[0])), None);
        for solved in &plates[0].objects {
            let (x, y) = (solved.x.as_f64(), solved.y.as_f64());
            let on_plate = 40.0 - 1e-3..=560.0 + 1e-3;
            assert!(on_plate.contains(&x) && on_plate.contains(&y), "({}, {})", x, y);
        }
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn test_oversized_object() {
        let config = SolverConfiguration::default();
        let objects = vec![cube(1, 20), cube(2, 300)];
        let mut last = None;
        let result = schedule_objects_for_sequential_print(&config, &mk3s_printer(), &objects, |p| last = Some(p));
        assert!(matches!(result, Err(Error::ObjectTooLarge { id: 2 })));
        assert_eq!(last, Some(100));
    }

    #[test]
    fn test_unknown_object_in_schedule() {
        let config = SolverConfiguration::default();
        let plate = ScheduledPlate {
            scheduled_objects: vec![seqarrange_core::ScheduledObject::new(42, 0, 0)],
        };
        let result = check_scheduled_objects_for_sequential_printability(&config, &mk3s_printer(), &[cube(1, 20)], &[plate]);
        assert!(matches!(result, Err(Error::UnsupportedConfiguration(_))));
    }

    #[test]
    fn test_invalid_configuration() {
        let config = SolverConfiguration::default().with_temporal_spread(0);
        let result = schedule_solvable_objects(&config, &[solvable(1, 10)], |_| {});
        assert!(matches!(result, Err(Error::UnsupportedConfiguration(_))));
    }
}

mod checker_tests {
    use super::*;

    #[test]
    fn test_schedule_then_check() {
        let config = SolverConfiguration::default();
        let printer = mk3s_printer();
        let objects: Vec<ObjectToPrint> = (1..=4).map(|id| cube(id, 20)).collect();

        let plates = schedule_objects_for_sequential_print(&config, &printer, &objects, |_| {}).unwrap();
        assert!(!plates.is_empty());
        let count: usize = plates.iter().map(ScheduledPlate::len).sum();
        assert_eq!(count, 4);

        let printable = check_scheduled_objects_for_sequential_printability(&config, &printer, &objects, &plates).unwrap();
        assert!(printable);
    }

    #[test]
    fn test_checker_is_idempotent() {
        let config = SolverConfiguration::default();
        let printer = mk3s_printer();
        let objects = vec![cube(1, 20), cube(2, 20)];
        // Object 2 sits right next to object 1 on the extruder side.
        let plate = ScheduledPlate {
            scheduled_objects: vec![
                seqarrange_core::ScheduledObject::new(1, 100 * MM, 100 * MM),
                seqarrange_core::ScheduledObject::new(2, 100 * MM, 125 * MM),
            ],
        };
        let plates = vec![plate];

        let first = check_scheduled_objects_for_sequential_conflict(&config, &printer, &objects, &plates).unwrap();
        let second = check_scheduled_objects_for_sequential_conflict(&config, &printer, &objects, &plates).unwrap();
        assert_eq!(first, Some((1, 2)));
        assert_eq!(first, second);
    }

    #[test]
    fn test_distant_objects_are_printable() {
        let config = SolverConfiguration::default();
        let printer = mk3s_printer();
        let objects = vec![cube(1, 20), cube(2, 20)];
        let plate = ScheduledPlate {
            scheduled_objects: vec![
                seqarrange_core::ScheduledObject::new(1, 40 * MM, 40 * MM),
                seqarrange_core::ScheduledObject::new(2, 200 * MM, 160 * MM),
            ],
        };
        let result = check_scheduled_objects_for_sequential_conflict(&config, &printer, &objects, &[plate]).unwrap();
        assert_eq!(result, None);
    }
}

mod search_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use seqarrange_core::{ProgressRange, ProgressReporter};
    use seqarrange_sequential::constraints::Presence;
    use seqarrange_sequential::optimizer::{optimize_binary_centered, scaled_region, BatchView};
    use seqarrange_sequential::refine::refine;
    use seqarrange_sequential::{ConstraintBuilder, MilpSession};

    #[test]
    fn test_feasible_size_is_monotone() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = SolverConfiguration::default()
            .with_plate(PlateBounds::Box(BoundingBox::new(Point::new(0, 0), Point::new(800, 800))));

        for _ in 0..3 {
            let objects: Vec<SolvableObject> = (1..=2)
                .map(|id| {
                    let half = rng.gen_range(20..60);
                    SolvableObject::new(id, rect(-half, -half, half, half))
                        .with_unreachable(vec![rect(-half - 30, -half - 30, half + 30, half + 30)])
                })
                .collect();
            let presence = [(0, Presence::Present), (1, Presence::Present)];
            let view = BatchView {
                presence: &presence,
                max_refines: None,
            };

            let mut builder = ConstraintBuilder::new(MilpSession::new(), &objects, &config);
            builder.add_undecided(0, 500.0);
            builder.add_undecided(1, 500.0);
            builder.introduce_all();
            let mut sink = |_: i32| {};
            let mut reporter = ProgressReporter::new(&mut sink);
            let best = optimize_binary_centered(&mut builder, &config, &view, &mut reporter, ProgressRange::full())
                .expect("two small objects fit the plate");
            let (found, _) = best.region.extents();

            // Every larger size stays feasible.
            for grow in [50.0, 200.0] {
                let size = (found + grow).min(800.0);
                let region = scaled_region(&config.plate, size, 800.0);
                let mut assumptions = builder.presence_assumptions(&presence);
                assumptions.extend(builder.containment_assumptions(&[0, 1], &region));
                assert!(refine(&mut builder, &assumptions, None).is_solved(), "size {}", size);
            }
        }
    }
}
