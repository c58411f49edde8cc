//! Analog measurement front end.
//!
//! The converter itself is a board concern; this module only names the
//! selectors carried by the `AD` command and implements the averaging
//! procedure the gateway runs over any [`Analog`] implementation.

use core::fmt::Debug;

/// Input selected by the first `AD` parameter character.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Channel {
    /// `V`: supply voltage monitor.
    #[default]
    Supply,
    /// `T`: on-die temperature sensor.
    Temperature,
    /// `3`: external input A3.
    A3,
    /// `4`: external input A4.
    A4,
    /// `5`: external input A5.
    A5,
    /// `6`: external input A6.
    A6,
    /// `7`: external input A7.
    A7,
}

impl Channel {
    /// Decodes a selector character.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'V' => Some(Channel::Supply),
            b'T' => Some(Channel::Temperature),
            b'3' => Some(Channel::A3),
            b'4' => Some(Channel::A4),
            b'5' => Some(Channel::A5),
            b'6' => Some(Channel::A6),
            b'7' => Some(Channel::A7),
            _ => None,
        }
    }

    /// Converter input number of this channel.
    pub fn input(self) -> u8 {
        match self {
            Channel::Supply => 11,
            Channel::Temperature => 10,
            Channel::A3 => 3,
            Channel::A4 => 4,
            Channel::A5 => 5,
            Channel::A6 => 6,
            Channel::A7 => 7,
        }
    }
}

/// Reference voltage selected by the second `AD` parameter character.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Reference {
    /// `1`: internal 1.5 V reference.
    Internal1V5,
    /// `2`: internal 2.5 V reference.
    Internal2V5,
    /// `3`: the supply rail.
    #[default]
    Supply,
}

impl Reference {
    /// Decodes a selector character.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'1' => Some(Reference::Internal1V5),
            b'2' => Some(Reference::Internal2V5),
            b'3' => Some(Reference::Supply),
            _ => None,
        }
    }
}

/// An analog-to-digital converter driven by polling.
pub trait Analog {
    /// Converter error.
    type Error: Debug;

    /// Selects input and reference for the following conversions.
    ///
    /// The implementation owns the analog front end: it powers the sensors
    /// (the sensor supply output driven high, then about 4095 cycles before
    /// the first conversion) and waits out any internal reference settling
    /// time before returning.
    fn configure(&mut self, channel: Channel, reference: Reference);

    /// Starts a conversion if none is running and reports its result.
    ///
    /// Returns `WouldBlock` until the conversion-complete flag is set.
    fn convert(&mut self) -> nb::Result<u16, Self::Error>;
}

/// Number of conversions averaged by [`average`].
pub const SAMPLES: u32 = 16;

/// Polls allowed for one conversion before it is abandoned.
pub const CONVERSION_POLL_LIMIT: u16 = 254;

/// Runs [`SAMPLES`] conversions and returns their mean.
///
/// Each conversion is polled at most [`CONVERSION_POLL_LIMIT`] times; one
/// that does not finish, or that fails, contributes zero to the sum.
pub fn average<A: Analog>(adc: &mut A, channel: Channel, reference: Reference) -> u16 {
    adc.configure(channel, reference);
    let mut sum: u32 = 0;
    for _ in 0..SAMPLES {
        for _ in 0..CONVERSION_POLL_LIMIT {
            match adc.convert() {
                Ok(value) => {
                    sum += u32::from(value);
                    break;
                }
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(_)) => {
                    warn!("conversion on input {} failed", channel.input());
                    break;
                }
            }
        }
    }
    (sum / SAMPLES) as u16
}
