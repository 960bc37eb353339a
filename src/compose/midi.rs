// Random loop generation and MIDI export
// Two tracks at 100 BPM: block chords (2 beats each) and a C-major melody
use midly::{Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;

use super::tables::{
    Instrument, CHORD_INSTRUMENTS, MELODY_INSTRUMENTS, PROGRESSIONS, SCALE_DEGREES, SILENCE,
};
use super::ComposeError;

pub const LOOP_BPM: f64 = 100.0;
/// Chord slots ("bars") per loop
pub const LOOP_BARS: usize = 8;
/// Beats per chord slot
pub const BEATS_PER_BAR: f64 = 2.0;
pub const NOTES_PER_BAR: usize = 4;
pub const PPQ: u16 = 480;

const CHORD_VELOCITY: u8 = 80;
const CHORD_CHANNEL: u8 = 0;
const MELODY_CHANNEL: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MelodyNote {
    pub start_beat: f64,
    pub duration_beats: f64,
    pub pitch: u8,
    pub velocity: u8,
}

/// A generated loop, ready for MIDI export
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSpec {
    /// Progression name, or "silence"
    pub progression: &'static str,
    pub chord_instrument: Instrument,
    pub melody_instrument: Instrument,
    /// One chord per bar; empty chords for silence
    pub chords: Vec<Vec<u8>>,
    pub melody: Vec<MelodyNote>,
}

/// Draw a random loop
pub fn generate_loop<R: Rng + ?Sized>(rng: &mut R) -> LoopSpec {
    // Silence is one more option next to the progressions
    let pick = rng.gen_range(0..=PROGRESSIONS.len());
    let (progression, chords) = match PROGRESSIONS.get(pick) {
        Some(progression) => {
            let chords = progression
                .chords
                .iter()
                .cycle()
                .take(LOOP_BARS)
                .map(|chord| chord.to_vec())
                .collect();
            (progression.name, chords)
        }
        None => (SILENCE, vec![Vec::new(); LOOP_BARS]),
    };

    let chord_instrument = *CHORD_INSTRUMENTS
        .choose(rng)
        .unwrap_or(&CHORD_INSTRUMENTS[0]);
    let mut melody_instrument = *MELODY_INSTRUMENTS
        .choose(rng)
        .unwrap_or(&MELODY_INSTRUMENTS[0]);
    while melody_instrument.program == chord_instrument.program {
        melody_instrument = *MELODY_INSTRUMENTS
            .choose(rng)
            .unwrap_or(&MELODY_INSTRUMENTS[0]);
    }

    let mut melody = Vec::with_capacity(LOOP_BARS * NOTES_PER_BAR);
    for bar in 0..LOOP_BARS {
        for step in 0..NOTES_PER_BAR {
            let degree = SCALE_DEGREES.choose(rng).copied().unwrap_or(0);
            melody.push(MelodyNote {
                start_beat: bar as f64 * BEATS_PER_BAR + step as f64 * 0.5,
                duration_beats: if rng.gen_bool(0.5) { 0.5 } else { 1.0 },
                pitch: 60 + degree,
                velocity: rng.gen_range(70..=110),
            });
        }
    }

    LoopSpec {
        progression,
        chord_instrument,
        melody_instrument,
        chords,
        melody,
    }
}

/// Export a loop and write it to `path`
pub fn write_loop_midi(spec: &LoopSpec, path: &Path) -> Result<(), ComposeError> {
    let bytes = export_loop_midi(spec)?;
    std::fs::write(path, &bytes).map_err(|source| ComposeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Wrote {} MIDI bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn beats_to_ticks(beats: f64) -> u32 {
    (beats * PPQ as f64).round() as u32
}

/// Export a loop as a format-1 MIDI file
pub fn export_loop_midi(spec: &LoopSpec) -> Result<Vec<u8>, ComposeError> {
    let header = Header {
        format: midly::Format::Parallel,
        timing: Timing::Metrical(PPQ.into()),
    };

    let mut meta_track = Track::new();
    meta_track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(b"META")),
    });
    meta_track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(((60_000_000.0 / LOOP_BPM) as u32).into())),
    });
    meta_track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
    });
    meta_track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let chord_notes: Vec<(u32, u32, u8, u8)> = spec
        .chords
        .iter()
        .enumerate()
        .flat_map(|(bar, chord)| {
            let start = beats_to_ticks(bar as f64 * BEATS_PER_BAR);
            let end = beats_to_ticks((bar + 1) as f64 * BEATS_PER_BAR);
            chord.iter().map(move |&key| (start, end, key, CHORD_VELOCITY))
        })
        .collect();

    let melody_notes: Vec<(u32, u32, u8, u8)> = spec
        .melody
        .iter()
        .map(|note| {
            (
                beats_to_ticks(note.start_beat),
                beats_to_ticks(note.start_beat + note.duration_beats),
                note.pitch,
                note.velocity,
            )
        })
        .collect();

    let loop_end = beats_to_ticks(LOOP_BARS as f64 * BEATS_PER_BAR);
    let chord_track = note_track("CHORDS", CHORD_CHANNEL, spec.chord_instrument.program, &chord_notes, loop_end);
    let melody_track = note_track("MELODY", MELODY_CHANNEL, spec.melody_instrument.program, &melody_notes, loop_end);

    let smf = Smf {
        header,
        tracks: vec![meta_track, chord_track, melody_track],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| ComposeError::Midi(e.to_string()))?;

    Ok(bytes)
}

/// Build one instrument track from (start, end, key, velocity) notes
fn note_track(
    name: &'static str,
    channel: u8,
    program: u8,
    notes: &[(u32, u32, u8, u8)],
    loop_end: u32,
) -> Track<'static> {
    let mut track = Track::new();
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
    });
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Midi {
            channel: channel.into(),
            message: MidiMessage::ProgramChange {
                program: program.into(),
            },
        },
    });

    // (tick, order, message); note-offs sort before note-ons on the same tick
    let mut events: Vec<(u32, u8, MidiMessage)> = Vec::with_capacity(notes.len() * 2);
    for &(start, end, key, vel) in notes {
        events.push((
            start,
            1,
            MidiMessage::NoteOn {
                key: key.into(),
                vel: vel.into(),
            },
        ));
        events.push((
            end,
            0,
            MidiMessage::NoteOff {
                key: key.into(),
                vel: 0.into(),
            },
        ));
    }
    events.sort_by_key(|(tick, order, _)| (*tick, *order));

    let mut last_tick = 0;
    for (tick, _, message) in events {
        track.push(TrackEvent {
            delta: tick.saturating_sub(last_tick).into(),
            kind: TrackEventKind::Midi {
                channel: channel.into(),
                message,
            },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: loop_end.saturating_sub(last_tick).into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_loop_shape() {
        let mut rng = StdRng::seed_from_u64(21);

        for _ in 0..50 {
            let spec = generate_loop(&mut rng);
            assert_eq!(spec.chords.len(), LOOP_BARS);
            assert_eq!(spec.melody.len(), LOOP_BARS * NOTES_PER_BAR);
            assert_ne!(spec.chord_instrument.program, spec.melody_instrument.program);

            for note in &spec.melody {
                assert!(SCALE_DEGREES.contains(&(note.pitch - 60)));
                assert!((70..=110).contains(&note.velocity));
                assert!(note.duration_beats == 0.5 || note.duration_beats == 1.0);
                assert_eq!((note.start_beat * 2.0).fract(), 0.0);
            }

            if spec.progression == SILENCE {
                assert!(spec.chords.iter().all(Vec::is_empty));
            } else {
                assert!(spec.chords.iter().all(|c| !c.is_empty()));
            }
        }
    }

    #[test]
    fn test_short_progressions_repeat() {
        // Find a seed that draws a 4-chord progression and check the repeat
        let mut rng = StdRng::seed_from_u64(0);
        let spec = (0..200)
            .map(|_| generate_loop(&mut rng))
            .find(|spec| spec.progression == "royal-road")
            .unwrap();
        assert_eq!(spec.chords[0], spec.chords[4]);
        assert_eq!(spec.chords[3], vec![65, 69, 72]);
    }

    #[test]
    fn test_export_parses_back() {
        let spec = generate_loop(&mut StdRng::seed_from_u64(5));
        let bytes = export_loop_midi(&spec).unwrap();

        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, midly::Format::Parallel);
        assert_eq!(smf.header.timing, Timing::Metrical(PPQ.into()));
        assert_eq!(smf.tracks.len(), 3);

        let note_ons = smf.tracks[2]
            .iter()
            .filter(|e| matches!(e.kind, TrackEventKind::Midi { message: MidiMessage::NoteOn { .. }, .. }))
            .count();
        assert_eq!(note_ons, LOOP_BARS * NOTES_PER_BAR);
    }

    #[test]
    fn test_write_into_missing_directory_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("loop.mid");
        let spec = generate_loop(&mut StdRng::seed_from_u64(9));

        match write_loop_midi(&spec, &path) {
            Err(ComposeError::Io { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("unexpected result: {:?}", other),
        }

        let ok = dir.path().join("loop.mid");
        write_loop_midi(&spec, &ok).unwrap();
        assert_eq!(std::fs::read(&ok).unwrap(), export_loop_midi(&spec).unwrap());
    }

    #[test]
    fn test_track_ends_at_loop_length() {
        let notes = [(0, 960, 60, 80)];
        let track = note_track("TEST", 0, 0, &notes, 7680);
        let total: u32 = track.iter().map(|e| e.delta.as_int()).sum();
        assert_eq!(total, 7680);
    }
}
