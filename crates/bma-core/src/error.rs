use thiserror::Error;

/// Errors originating from the decoding pipeline.
///
/// `NonAsciiSymbol` and `OutOfData` are recoverable: the calibration loop
/// turns them into a retry with another tempo. The other kinds surface to
/// the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Spectral window without any sample.
    #[error("Fenêtre spectrale vide")]
    InvalidWindow,

    /// No frequency bin reaches the carrier and the bin policy rejects the fallback.
    #[error("Fréquence hors plage : {target_hz} Hz (max {max_hz} Hz)")]
    FrequencyOutOfRange {
        /// Requested carrier frequency.
        target_hz: f64,
        /// Highest non-negative bin frequency of the window.
        max_hz: f64,
    },

    /// Fewer than two beats were detected, the tempo is undeterminable.
    #[error("Pas assez de beats détectés : {found}")]
    InsufficientBeats {
        /// Number of beats the detector found.
        found: usize,
    },

    /// Tempo that cannot be used to size a beat window (zero, negative, NaN).
    #[error("Tempo inutilisable : {bpm} bpm")]
    UndeterminableTempo {
        /// The rejected tempo.
        bpm: f64,
    },

    /// The last decoded symbol is not an ASCII alphanumeric character.
    #[error("Symbole non ASCII : {value:#04x}")]
    NonAsciiSymbol {
        /// Raw symbol value.
        value: u8,
    },

    /// A beat window runs past the end of the sample data.
    #[error("Fin des données au beat {beat} ({needed} échantillons requis, {available} disponibles)")]
    OutOfData {
        /// Index of the beat whose window did not fit.
        beat: usize,
        /// End index the window needed.
        needed: usize,
        /// Number of samples available.
        available: usize,
    },

    /// Attempt budget exhausted without framing a message.
    #[error("Message caché introuvable après {attempts} tentatives")]
    NotFound {
        /// Number of attempts performed.
        attempts: u32,
    },
}

impl DecodeError {
    /// `true` for the kinds that only invalidate the current tempo assumption.
    ///
    /// # Example
    /// ```
    /// use bma_core::error::DecodeError;
    /// assert!(DecodeError::NonAsciiSymbol { value: 0 }.is_recoverable());
    /// assert!(!DecodeError::InvalidWindow.is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonAsciiSymbol { .. } | Self::OutOfData { .. })
    }
}
