/// Note names per pitch class, sharps only.
pub const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// A MIDI note number split into pitch class (0 = C .. 11 = B) and octave (0..=10).
///
/// Octave 0 starts at note 0, so middle C (60) is octave 5 here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pitch {
    pub class: u8,
    pub octave: u8,
}

impl Pitch {
    pub fn of(note: u8) -> Self {
        Self { class: note % 12, octave: note / 12 }
    }

    pub fn name(&self) -> &'static str {
        NOTE_NAMES[self.class as usize]
    }

    /// Black key on a piano keyboard.
    pub fn is_sharp(&self) -> bool {
        self.name().len() == 2
    }
}
