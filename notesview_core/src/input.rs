// Input normalization: keyboard keys and MIDI bytes become `NoteInput`.
//
// Every source is reduced to the same shape before it reaches the session:
// a canonical `Pitch`, a velocity in [0, 1], and a tag naming the source.
// The session judges all sources identically; the tag is only logged.
//
// Computer keyboard ("Logic Pro" layout):
//
//     w e   t y u          C# D#   F# G# A#
//    a s d f g h j        C  D  E  F  G  A  B
//
// plus digit keys 1-7 for the naturals C-B. `z` / `x` shift the octave down
// or up (clamped to 0..=8). A sharp modifier raises a natural key by one
// semitone and leaves black keys alone. `KeyboardMapper` carries the current
// octave between presses.
//
// MIDI: raw message bytes are decoded with `midly`'s live-event parser.
// Note-on with velocity 0 is a note-off. Note numbers map to pitches with
// `octave = n / 12 - 1`, velocities are divided by 127.

use crate::pitch::{Pitch, PitchClass};
use midly::MidiMessage;
use midly::live::LiveEvent;
use serde::{Deserialize, Serialize};

/// Where a note came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSource {
    ComputerKeyboard,
    VirtualPiano,
    Midi,
}

/// One normalized key press.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteInput {
    pub pitch: Pitch,
    /// 0.0 silent to 1.0 full.
    pub velocity: f32,
    pub source: InputSource,
}

impl NoteInput {
    pub fn new(pitch: Pitch, source: InputSource) -> Self {
        Self {
            pitch,
            velocity: 1.0,
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// MIDI
// ---------------------------------------------------------------------------

pub const MIDI_NOTE_MAX: u8 = 127;

/// Map a MIDI note number to a pitch. Numbers above 127 clamp to 127.
pub fn midi_number_to_pitch(number: u8) -> Pitch {
    let n = number.min(MIDI_NOTE_MAX) as i32;
    Pitch::new(PitchClass::from_index(n), (n / 12 - 1) as i8)
}

/// The MIDI note number of a pitch, if it lies in 0..=127.
pub fn pitch_to_midi_number(pitch: Pitch) -> Option<u8> {
    let n = pitch.absolute_index() + 12;
    u8::try_from(n).ok().filter(|&n| n <= MIDI_NOTE_MAX)
}

/// Raw 0..=127 velocity to [0, 1].
pub fn normalize_velocity(raw: u8) -> f32 {
    raw.min(MIDI_NOTE_MAX) as f32 / MIDI_NOTE_MAX as f32
}

/// A decoded note message.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MidiNoteEvent {
    On { channel: u8, input: NoteInput },
    Off { channel: u8, pitch: Pitch },
}

/// Decode one raw MIDI message. Anything other than note on/off (including
/// malformed bytes) yields `None`.
pub fn decode_midi(bytes: &[u8]) -> Option<MidiNoteEvent> {
    let LiveEvent::Midi { channel, message } = LiveEvent::parse(bytes).ok()? else {
        return None;
    };
    let channel = channel.as_int();
    match message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => Some(MidiNoteEvent::On {
            channel,
            input: NoteInput {
                pitch: midi_number_to_pitch(key.as_int()),
                velocity: normalize_velocity(vel.as_int()),
                source: InputSource::Midi,
            },
        }),
        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
            Some(MidiNoteEvent::Off {
                channel,
                pitch: midi_number_to_pitch(key.as_int()),
            })
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Computer keyboard
// ---------------------------------------------------------------------------

pub const MIN_KEYBOARD_OCTAVE: i8 = 0;
pub const MAX_KEYBOARD_OCTAVE: i8 = 8;
pub const DEFAULT_KEYBOARD_OCTAVE: i8 = 4;

/// What a key press means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Shift the keyboard octave by this many octaves.
    OctaveChange(i8),
    Note(Pitch),
}

fn key_pitch_class(key: char) -> Option<PitchClass> {
    use PitchClass::*;
    let class = match key.to_ascii_lowercase() {
        'a' | '1' => C,
        'w' => CSharp,
        's' | '2' => D,
        'e' => DSharp,
        'd' | '3' => E,
        'f' | '4' => F,
        't' => FSharp,
        'g' | '5' => G,
        'y' => GSharp,
        'h' | '6' => A,
        'u' => ASharp,
        'j' | '7' => B,
        _ => return None,
    };
    Some(class)
}

/// Interpret one key at a given octave. Unmapped keys yield `None`.
///
/// A sharp on E or B sounds F or the next octave's C (`B#4` is `C5`).
pub fn map_key(key: char, octave: i8, sharp: bool) -> Option<KeyAction> {
    match key.to_ascii_lowercase() {
        'z' => return Some(KeyAction::OctaveChange(-1)),
        'x' => return Some(KeyAction::OctaveChange(1)),
        _ => {}
    }
    let class = key_pitch_class(key)?;
    let pitch = Pitch::new(class, octave);
    let pitch = if sharp && !class.is_black_key() {
        pitch.transpose(1)?
    } else {
        pitch
    };
    Some(KeyAction::Note(pitch))
}

/// Stateful keyboard mapping: remembers the octave across presses.
#[derive(Clone, Debug)]
pub struct KeyboardMapper {
    octave: i8,
}

impl Default for KeyboardMapper {
    fn default() -> Self {
        Self {
            octave: DEFAULT_KEYBOARD_OCTAVE,
        }
    }
}

impl KeyboardMapper {
    pub fn new(octave: i8) -> Self {
        Self {
            octave: octave.clamp(MIN_KEYBOARD_OCTAVE, MAX_KEYBOARD_OCTAVE),
        }
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    /// Handle a key. Octave keys update state and return `None`; note keys
    /// return the press.
    pub fn press(&mut self, key: char, sharp: bool) -> Option<NoteInput> {
        match map_key(key, self.octave, sharp)? {
            KeyAction::OctaveChange(delta) => {
                self.octave =
                    (self.octave + delta).clamp(MIN_KEYBOARD_OCTAVE, MAX_KEYBOARD_OCTAVE);
                None
            }
            KeyAction::Note(pitch) => Some(NoteInput::new(pitch, InputSource::ComputerKeyboard)),
        }
    }
}
