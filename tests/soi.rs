use stellar_planner::impulsive::{Command, Trigger};
use stellar_planner::orbits::Orbit;
use stellar_planner::primitives::constants::{AU_KM, EARTH_MU_KM3_S2, SUN_MU_KM3_S2};
use stellar_planner::primitives::vector;
use stellar_planner::system::{Body, Event, Universe};

#[test]
fn leaving_soi_moves_satellite_between_child_lists() {
    let mut universe = Universe::new();
    let body1 = universe.add_root("Sun", Body::new(SUN_MU_KM3_S2, 695_700.0)).unwrap();
    let body2 = universe
        .add_body(
            body1,
            "Earth",
            Body::new(EARTH_MU_KM3_S2, 6_371.0),
            Orbit::circular(AU_KM, SUN_MU_KM3_S2).unwrap(),
        )
        .unwrap();
    let satellite = universe
        .add_vessel(body2, "Satellite", Orbit::circular(400_000.0, EARTH_MU_KM3_S2).unwrap())
        .unwrap();

    assert_eq!(universe.children(body1).unwrap().len(), 1);
    assert_eq!(universe.children(body2).unwrap(), &[satellite]);

    universe.leave_soi(satellite).unwrap();

    assert_eq!(universe.children(body1).unwrap(), &[body2, satellite]);
    assert!(universe.children(body2).unwrap().is_empty());
    assert_eq!(universe.parent(satellite).unwrap(), Some(body1));
}

#[test]
fn scripted_escape_burn_leaves_the_planet() {
    let mut universe = Universe::new();
    let sun = universe.add_root("Sun", Body::new(SUN_MU_KM3_S2, 695_700.0)).unwrap();
    let earth = universe
        .add_body(
            sun,
            "Earth",
            Body::new(EARTH_MU_KM3_S2, 6_371.0),
            Orbit::circular(AU_KM, SUN_MU_KM3_S2).unwrap(),
        )
        .unwrap();
    let probe = universe
        .add_vessel(earth, "Probe", Orbit::circular(7_000.0, EARTH_MU_KM3_S2).unwrap())
        .unwrap();
    // well past escape speed at 7000 km
    universe.push_command(probe, Command::Impulse([0.0, 5.0, 0.0]), Trigger::Asap).unwrap();
    universe
        .push_command(probe, Command::CircularizeAtPeriapsis, Trigger::OnExitSoi)
        .unwrap();

    let mut events = Vec::new();
    for _ in 0..200 {
        events.extend(universe.tick(3_600.0));
        if universe.parent(probe).unwrap() == Some(sun) {
            break;
        }
    }

    assert!(events.iter().any(|e| matches!(e, Event::ManeuverExecuted { id, .. } if *id == probe)));
    assert!(events.contains(&Event::ExitedSoi {
        id: probe,
        from: earth,
        to: sun
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::CommandExecuted { trigger: Trigger::OnExitSoi, .. }
    )));
    let heliocentric = universe.entity(probe).unwrap().orbit.unwrap();
    assert!(heliocentric.is_elliptic());
    assert!((heliocentric.semi_major_axis / AU_KM - 1.0).abs() < 0.5);

    let earth_position = universe.entity(earth).unwrap().kinematics.absolute_position();
    let probe_position = universe.entity(probe).unwrap().kinematics.absolute_position();
    let soi = universe.entity(earth).unwrap().body.unwrap().soi;
    assert!(vector::distance(&earth_position, &probe_position) > soi);
}
