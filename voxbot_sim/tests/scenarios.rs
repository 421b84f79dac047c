// End-to-end scenarios driving `SimState` through its command interface.
//
// Each test builds a small world, places the agent with `SetAgentLocation`
// (as the server would), issues operator commands and steps the sim at its
// fixed tick rate, checking where the agent ends up and what it reported.

use voxbot_sim::behaviour::WalkMode;
use voxbot_sim::block::BlockKind;
use voxbot_sim::command::{SimAction, SimCommand};
use voxbot_sim::config::BotConfig;
use voxbot_sim::event::{SimEvent, SimEventKind};
use voxbot_sim::sim::SimState;
use voxbot_sim::types::{EntityId, VoxelCoord};
use voxbot_sim::waypoint::Waypoint;
use voxbot_sim::world::VoxelWorld;

/// Two simulated seconds per step at 20 ticks per second.
const STEP_TICKS: u64 = 40;

fn c(x: i32, y: i32, z: i32) -> VoxelCoord {
    VoxelCoord::new(x, y, z)
}

fn cmd(tick: u64, action: SimAction) -> SimCommand {
    SimCommand { tick, action }
}

/// A `size` x `size` stone floor at y = 0 with the agent standing on it.
fn flat_sim(size: u32, agent: VoxelCoord) -> SimState {
    let mut world = VoxelWorld::new(size, 8, size);
    let edge = size as i32 - 1;
    world.fill(c(0, 0, 0), c(edge, 0, edge), BlockKind::Stone);
    let mut sim = SimState::with_world(BotConfig::default(), world);
    sim.step(
        &[cmd(1, SimAction::SetAgentLocation { position: agent.floor_center() })],
        1,
    )
    .unwrap();
    sim
}

/// Step until the behaviour stack is empty or `max_ticks` pass. Returns every
/// event seen on the way.
fn run_until_idle(sim: &mut SimState, commands: &[SimCommand], max_ticks: u64) -> Vec<SimEvent> {
    let end = sim.tick + max_ticks;
    let mut events = sim.step(commands, sim.tick + 1).unwrap().events;
    while sim.tick < end && !sim.behaviours.is_idle() {
        let target = (sim.tick + STEP_TICKS).min(end);
        events.extend(sim.step(&[], target).unwrap().events);
    }
    events
}

fn finished(events: &[SimEvent], prefix: &str) -> Vec<bool> {
    events
        .iter()
        .filter_map(|e| match &e.kind {
            SimEventKind::BehaviourFinished { name, success } if name.starts_with(prefix) => {
                Some(*success)
            }
            _ => None,
        })
        .collect()
}

#[test]
fn travel_across_a_flat_floor_arrives() {
    let mut sim = flat_sim(16, c(2, 1, 2));
    let goal = c(12, 1, 9);
    let tick = sim.tick + 1;
    let events = run_until_idle(&mut sim, &[cmd(tick, SimAction::TravelTo { coords: goal })], 400);

    assert!(sim.behaviours.is_idle());
    assert_eq!(finished(&events, "travel"), [true]);
    let offset = sim.offset_to(goal);
    assert!(offset.length() <= sim.config.behaviour.arrival_tolerance + 0.05);
    assert!((sim.body.position.y - 1.0).abs() < 1e-6);
    assert!(sim.body.on_ground);
}

#[test]
fn travel_climbs_a_slab_staircase() {
    let mut sim = flat_sim(12, c(1, 1, 5));
    sim.step(
        &[
            cmd(2, SimAction::SetBlock { coord: c(4, 1, 5), kind: BlockKind::Slab }),
            cmd(2, SimAction::SetBlock { coord: c(5, 1, 5), kind: BlockKind::Stone }),
            cmd(2, SimAction::SetBlock { coord: c(6, 1, 5), kind: BlockKind::Stone }),
            cmd(2, SimAction::SetBlock { coord: c(6, 2, 5), kind: BlockKind::Slab }),
        ],
        2,
    )
    .unwrap();
    let goal = c(6, 2, 5);
    let tick = sim.tick + 1;
    let events = run_until_idle(&mut sim, &[cmd(tick, SimAction::TravelTo { coords: goal })], 400);

    assert_eq!(finished(&events, "travel"), [true]);
    assert!((sim.body.position.y - 2.5).abs() < 1e-6);
}

#[test]
fn unknown_group_reports_once_and_fails() {
    let mut sim = flat_sim(8, c(2, 1, 2));
    let tick = sim.tick + 1;
    let events = run_until_idle(
        &mut sim,
        &[cmd(tick, SimAction::WalkSigns { group: "X".to_string(), mode: WalkMode::Circulate })],
        20,
    );

    let chats: Vec<_> = events.iter().filter_map(SimEvent::chat_message).collect();
    assert_eq!(chats, ["cannot circulate group named X"]);
    assert_eq!(finished(&events, "circulate"), [false]);
    assert!(sim.behaviours.is_idle());
}

#[test]
fn go_to_sign_walks_to_the_named_waypoint() {
    let mut sim = flat_sim(12, c(1, 1, 1));
    let well = Waypoint {
        coords: c(8, 2, 6),
        name: "well".to_string(),
        group: None,
        order: None,
    };
    let tick = sim.tick + 1;
    let events = run_until_idle(
        &mut sim,
        &[
            cmd(tick, SimAction::AddWaypoint(well)),
            cmd(tick, SimAction::GoToSign { name: "well".to_string() }),
        ],
        400,
    );

    assert_eq!(finished(&events, "go to well"), [true]);
    assert!(sim.offset_to(c(8, 1, 6)).length() <= sim.config.behaviour.arrival_tolerance + 0.05);
}

#[test]
fn cancel_empties_the_stack_and_returns_to_the_commander() {
    let mut sim = flat_sim(16, c(2, 1, 2));
    let commander = sim.config.behaviour.commander_name.clone();
    sim.step(
        &[
            cmd(2, SimAction::EntitySpawned {
                id: EntityId(3),
                name: commander,
                position: c(2, 1, 10).floor_center(),
            }),
            cmd(2, SimAction::TravelTo { coords: c(14, 1, 14) }),
        ],
        5,
    )
    .unwrap();
    assert!(!sim.behaviours.is_idle());

    let result = sim.step(&[cmd(6, SimAction::CancelBehaviours)], 7).unwrap();
    assert!(sim.behaviours.is_idle());
    assert!(result
        .events
        .iter()
        .any(|e| matches!(e.kind, SimEventKind::BehaviourCancelled { .. })));
    // Back on the default frame, facing the commander and floating in place.
    assert!(sim.body.floating);
    let held = sim.body.position;
    sim.step(&[], 20).unwrap();
    assert!((sim.body.position.y - held.y).abs() < 1e-9);
}

#[test]
fn blocking_the_route_mid_walk_replans() {
    let mut sim = flat_sim(16, c(2, 1, 7));
    let goal = c(13, 1, 7);
    let tick = sim.tick + 1;
    sim.step(&[cmd(tick, SimAction::TravelTo { coords: goal })], tick + 5)
        .unwrap();
    // Wall across the straight line, with a gap at z = 12.
    let wall: Vec<SimCommand> = (0..12)
        .flat_map(|z| {
            [1, 2].map(|y| {
                cmd(sim.tick + 1, SimAction::SetBlock { coord: c(8, y, z), kind: BlockKind::Stone })
            })
        })
        .collect();
    let events = run_until_idle(&mut sim, &wall, 600);

    assert_eq!(finished(&events, "travel"), [true]);
    assert!(sim.offset_to(goal).length() <= sim.config.behaviour.arrival_tolerance + 0.05);
}

#[test]
fn ladder_out_of_jump_reach_fails_the_travel() {
    // A ladder standing on a fence post: its standing surface is 1.5 above
    // the floor, past the jump height. The floor has no edge into it, so the
    // travel fails instead of walking into the fence.
    let mut sim = flat_sim(8, c(1, 1, 3));
    sim.step(
        &[
            cmd(2, SimAction::SetBlock { coord: c(3, 1, 3), kind: BlockKind::Fence }),
            cmd(2, SimAction::SetBlock { coord: c(3, 2, 3), kind: BlockKind::Ladder }),
        ],
        2,
    )
    .unwrap();
    assert!(sim.navmesh.graph.has_node(c(3, 2, 3)));
    assert!(!sim.navmesh.graph.has_edge(c(2, 1, 3), c(3, 2, 3)));

    let tick = sim.tick + 1;
    let events = run_until_idle(
        &mut sim,
        &[cmd(tick, SimAction::TravelTo { coords: c(3, 2, 3) })],
        200,
    );

    assert_eq!(finished(&events, "travel"), [false]);
    assert!(sim.behaviours.is_idle());
    assert!(!sim.is_halted());
    let tick = sim.tick;
    sim.step(&[], tick + 10).unwrap();
    assert_eq!(sim.tick, tick + 10);
}

#[test]
fn commands_apply_at_their_tick() {
    let mut sim = flat_sim(8, c(2, 1, 2));
    let result = sim
        .step(
            &[
                cmd(5, SimAction::SetBlock { coord: c(4, 1, 4), kind: BlockKind::Stone }),
                cmd(9, SimAction::SetBlock { coord: c(5, 1, 5), kind: BlockKind::Stone }),
            ],
            10,
        )
        .unwrap();
    let ticks: Vec<u64> = result
        .events
        .iter()
        .filter(|e| matches!(e.kind, SimEventKind::NavGraphChanged { .. }))
        .map(|e| e.tick)
        .collect();
    assert_eq!(ticks, [5, 9]);
}
