//! Demo entities and systems exercised by the runner.

use rewind_record::{Capabilities, RecordResult, Recordable, SubObject, decode_state, encode_state};
use rewind_session::{CycleContext, Phase, Session, SessionResult};
use serde::{Deserialize, Serialize};

/// Half-width of the square the movers bounce around in.
const ARENA: f64 = 10.0;

/// Moves in a straight line and bounces off the arena walls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mover {
    pub position: [f64; 2],
    pub velocity: [f64; 2],
}

impl SubObject for Mover {}

impl Recordable for Mover {
    type Record = Self;

    fn capture(&self, record: &mut Self) {
        *record = *self;
    }

    fn apply(&mut self, record: &Self) {
        *self = *record;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpinState {
    pub degrees: f64,
    pub revolutions: u32,
}

/// Recorded through the generic component record.
#[derive(Debug)]
pub struct Spinner {
    pub enabled: bool,
    pub rate: f64,
    pub state: SpinState,
}

impl SubObject for Spinner {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ENABLE | Capabilities::STATE
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn save_state(&self, out: &mut Vec<u8>) -> RecordResult<()> {
        encode_state(&self.state, out)
    }

    fn load_state(&mut self, bytes: &[u8]) -> RecordResult<()> {
        self.state = decode_state(bytes)?;
        Ok(())
    }
}

/// Blinks; only its enabled flag is recorded.
#[derive(Debug)]
pub struct Beacon {
    pub lit: bool,
    pub period: u64,
}

impl SubObject for Beacon {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ENABLE
    }

    fn is_enabled(&self) -> bool {
        self.lit
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.lit = enabled;
    }
}

/// Tag with nothing to record.
#[derive(Debug)]
pub struct Marker;

impl SubObject for Marker {}

fn motion(ctx: &mut CycleContext<'_>) {
    if ctx.is_applying_records() {
        return;
    }
    let dt = ctx.delta_time();
    for recorder in ctx.entities.iter_active_mut() {
        if let Some(mover) = recorder.find_mut::<Mover>() {
            mover.position[0] += mover.velocity[0] * dt;
            mover.position[1] += mover.velocity[1] * dt;
        }
    }
}

fn bounce(ctx: &mut CycleContext<'_>) {
    if ctx.is_applying_records() {
        return;
    }
    for recorder in ctx.entities.iter_active_mut() {
        if let Some(mover) = recorder.find_mut::<Mover>() {
            for (position, velocity) in mover.position.iter_mut().zip(&mut mover.velocity) {
                if position.abs() > ARENA {
                    *position = position.clamp(-ARENA, ARENA);
                    *velocity = -*velocity;
                }
            }
        }
    }
}

fn spin(ctx: &mut CycleContext<'_>) {
    if ctx.is_applying_records() {
        return;
    }
    let dt = ctx.delta_time();
    let cycle = ctx.clock.cycle_number();
    for recorder in ctx.entities.iter_active_mut() {
        if let Some(spinner) = recorder.find_mut::<Spinner>() {
            if spinner.enabled {
                spinner.state.degrees += spinner.rate * dt;
                while spinner.state.degrees >= 360.0 {
                    spinner.state.degrees -= 360.0;
                    spinner.state.revolutions += 1;
                }
            }
        }
        if let Some(beacon) = recorder.find_mut::<Beacon>() {
            if dt > 0.0 && cycle % beacon.period == 0 {
                beacon.lit = !beacon.lit;
            }
        }
    }
}

/// Register record chains, systems and a handful of entities.
pub fn populate(session: &mut Session) -> SessionResult<()> {
    session.register::<Mover>();
    session
        .add_system(Phase::Update, motion)
        .add_system(Phase::Update, spin)
        .add_system(Phase::FixedUpdate, bounce);

    for (i, velocity) in [[3.0, 1.5], [-2.0, 4.0], [0.5, -5.0]].into_iter().enumerate() {
        let entity = session.spawn();
        session.attach(
            entity,
            Mover {
                position: [i as f64, 0.0],
                velocity,
            },
        )?;
    }

    let rig = session.spawn();
    session.attach(
        rig,
        Spinner {
            enabled: true,
            rate: 90.0,
            state: SpinState::default(),
        },
    )?;
    session.attach(rig, Beacon { lit: false, period: 30 })?;
    session.attach(rig, Marker)?;
    Ok(())
}

/// One-line summary of the first mover, for status output.
pub fn describe(session: &Session) -> String {
    let mover = session
        .recorders()
        .find_map(|recorder| recorder.find::<Mover>());
    let spinner = session
        .recorders()
        .find_map(|recorder| recorder.find::<Spinner>());

    let mut line = String::new();
    if let Some(mover) = mover {
        line.push_str(&format!(
            "mover=({:.2}, {:.2})",
            mover.position[0], mover.position[1]
        ));
    }
    if let Some(spinner) = spinner {
        line.push_str(&format!(
            " spinner={:.1}deg/{}rev",
            spinner.state.degrees, spinner.state.revolutions
        ));
    }
    line
}

#[cfg(test)]
mod tests {
    use rewind_clock::{ClockConfig, ManualTime};

    use super::*;

    #[test]
    fn test_demo_rewinds_movers() {
        let mut session = Session::new(ClockConfig::default(), ManualTime::new(1.0 / 60.0)).unwrap();
        populate(&mut session).unwrap();

        session.tick_n(30).unwrap();
        let before = describe(&session);
        session.tick_n(30).unwrap();
        assert_ne!(describe(&session), before);

        session.clock_mut().set_frozen(true);
        assert!(session.clock_mut().initiate_rewind());
        session.tick_n(30).unwrap();
        assert_eq!(session.clock().cycle_number(), 29);
        assert_eq!(describe(&session), before);
    }
}
