//! Command dispatch: local execution or relay onto the subordinate bus.
//!
//! [`Gateway`] owns every main-loop resource of the node. Each call to
//! [`poll`](Gateway::poll) takes at most one completed [`CommandFrame`] from
//! the host receive path and either
//!
//! - executes it locally when it is addressed to [`NODE_ID`], replying
//!   `ID payload CR LF`, or
//! - relays it verbatim to the subordinates, waits for their answer with
//!   [`collect`], reconciles duplicated payloads with [`reconcile`] and
//!   forwards the result followed by LF.
//!
//! Host receipt stays masked from the moment the frame completes until the
//! reply has been written, so the host cannot overrun a frame in flight.
//!
//! ## Example
//!
//! ```rust,ignore
//! samewire::init_gateway!(TxPin, RxPin, Timer, LineEdge);
//!
//! fn main() -> ! {
//!     samewire::setup_soft_uart!(tx, rx, timer, edge, StopBitMode::EdgeSync);
//!     let bus = SharedBus::new(&SOFT_UART);
//!     let store = ParamStore::new(flash, watchdog);
//!     let mut gateway = Gateway::new(host, host_rx, bus, power, delay, adc, store, &COMMAND);
//!     gateway.init();
//!     gateway.run()
//! }
//! ```

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal_nb::serial::{self, Error as _};
use nb::block;

use crate::analog::{Analog, average};
use crate::bus::BusLink;
use crate::codec::{format_decimal, format_extended_decimal};
use crate::collector::{TimingStats, WaitOutcome, collect};
use crate::consts::{
    CR, DEFAULT_READ_DELAY, FIRMWARE_TYPE, FIRMWARE_VERSION, LF, NODE_ID, REPLY_DONE, REPLY_NO,
    REPLY_OK,
};
use crate::error::GatewayError;
use crate::frame::{Command, CommandFrame, ResponseFrame};
use crate::hal::{InterruptGate, Masked};
use crate::redundancy::{Verdict, reconcile};
use crate::store::{InfoFlash, ParamStore};
use crate::timer::{DEAD_TIME_NS, RESET_PULSE_MS};

/// What a call to [`Gateway::poll`] did.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Dispatch {
    /// No completed frame was waiting.
    Idle,
    /// A frame addressed to this node had the wrong shape and was dropped.
    Discarded,
    /// A local command was executed and answered.
    Local(Command),
    /// A frame was relayed and the subordinates' answer forwarded.
    Relayed {
        /// How the response wait ended.
        wait: WaitOutcome,
        /// What the redundancy check made of the response.
        verdict: Verdict,
    },
}

/// Renders the low 24 bits of `value` as an integer.
fn push_number(reply: &mut ResponseFrame, value: u32) {
    let high = ((value >> 16) & 0xFF) as u8;
    let _ = reply.extend_from_slice(&format_extended_decimal(high, value as u16, 0));
}

/// Everything the dispatcher drives apart from host receipt.
#[derive(Debug)]
pub struct Node<HOST, BUS, PWR, DLY, ADC, FLASH, WDT>
where
    HOST: serial::Write<u8>,
    BUS: BusLink,
    PWR: OutputPin,
    DLY: DelayNs,
    ADC: Analog,
    FLASH: InfoFlash,
    WDT: InterruptGate,
{
    /// Host serial link.
    pub host: HOST,
    /// Subordinate bus.
    pub bus: BUS,
    /// Bus power switch.
    pub power: PWR,
    /// Blocking delay.
    pub delay: DLY,
    /// Analog converter.
    pub adc: ADC,
    /// Persisted parameters.
    pub store: ParamStore<FLASH, WDT>,
    /// Round-trip delay statistics.
    pub stats: TimingStats,
}

/// The gateway node.
///
/// ## Type Parameters
///
/// - `HOST`: host serial link
/// - `GATE`: host receive interrupt enable
/// - `BUS`: subordinate bus
/// - `PWR`: bus power switch, high = powered
/// - `DLY`: blocking delay
/// - `ADC`: analog converter for `AD`
/// - `FLASH`, `WDT`: parameter store backing and watchdog interrupt
#[derive(Debug)]
pub struct Gateway<'a, HOST, GATE, BUS, PWR, DLY, ADC, FLASH, WDT>
where
    HOST: serial::Write<u8>,
    GATE: InterruptGate,
    BUS: BusLink,
    PWR: OutputPin,
    DLY: DelayNs,
    ADC: Analog,
    FLASH: InfoFlash,
    WDT: InterruptGate,
{
    /// Host receive interrupt, masked while a frame is being handled.
    pub host_rx: GATE,
    /// Resources used to handle a frame.
    pub node: Node<HOST, BUS, PWR, DLY, ADC, FLASH, WDT>,
    command: &'a Mutex<RefCell<CommandFrame>>,
}

impl<'a, HOST, GATE, BUS, PWR, DLY, ADC, FLASH, WDT>
    Gateway<'a, HOST, GATE, BUS, PWR, DLY, ADC, FLASH, WDT>
where
    HOST: serial::Write<u8>,
    GATE: InterruptGate,
    BUS: BusLink,
    PWR: OutputPin,
    DLY: DelayNs,
    ADC: Analog,
    FLASH: InfoFlash,
    WDT: InterruptGate,
{
    /// Assembles the gateway. `command` is the frame filled by the host
    /// receive interrupt.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: HOST,
        host_rx: GATE,
        bus: BUS,
        power: PWR,
        delay: DLY,
        adc: ADC,
        store: ParamStore<FLASH, WDT>,
        command: &'a Mutex<RefCell<CommandFrame>>,
    ) -> Self {
        Self {
            host_rx,
            node: Node {
                host,
                bus,
                power,
                delay,
                adc,
                store,
                stats: TimingStats::default(),
            },
            command,
        }
    }

    /// Boot sequence: persists the default timeout on first boot, powers
    /// the bus and leaves the line idle.
    pub fn init(&mut self) {
        let node = &mut self.node;
        match node.store.ensure_default() {
            Ok(true) => debug!("response timeout initialised"),
            Ok(false) => {}
            Err(e) => warn!("response timeout init failed: {}", e),
        }
        let _ = node.power.set_high();
        node.bus.release();
    }

    /// Dispatches the pending command frame, if any.
    ///
    /// # Errors
    /// [`GatewayError::HostLink`] if the reply could not be written. The bus
    /// and host receipt are back in their idle state either way.
    pub fn poll(&mut self) -> Result<Dispatch, GatewayError> {
        let frame = critical_section::with(|cs| self.command.borrow_ref_mut(cs).take_complete());
        let Some(frame) = frame else {
            return Ok(Dispatch::Idle);
        };

        let _host_rx = Masked::new(&mut self.host_rx);
        self.node.dispatch(&frame)
    }

    /// Polls forever.
    pub fn run(&mut self) -> ! {
        loop {
            if self.poll().is_err() {
                warn!("reply to host lost");
            }
        }
    }
}

impl<HOST, BUS, PWR, DLY, ADC, FLASH, WDT> Node<HOST, BUS, PWR, DLY, ADC, FLASH, WDT>
where
    HOST: serial::Write<u8>,
    BUS: BusLink,
    PWR: OutputPin,
    DLY: DelayNs,
    ADC: Analog,
    FLASH: InfoFlash,
    WDT: InterruptGate,
{
    fn dispatch(&mut self, frame: &CommandFrame) -> Result<Dispatch, GatewayError> {
        if !frame.is_addressed_to(NODE_ID) {
            let (wait, verdict) = self.relay(frame)?;
            return Ok(Dispatch::Relayed { wait, verdict });
        }
        if !frame.is_well_formed() {
            debug!("malformed local frame of {} bytes dropped", frame.len());
            return Ok(Dispatch::Discarded);
        }
        let command = Command::parse(frame);
        debug!("local command {:?}", command);
        let reply = self.execute(command);
        self.reply(&reply)?;
        Ok(Dispatch::Local(command))
    }

    fn execute(&mut self, command: Command) -> ResponseFrame {
        let mut reply = ResponseFrame::new();
        let _ = reply.push(NODE_ID);
        match command {
            Command::FirmwareVersion => {
                let _ = reply.extend_from_slice(&FIRMWARE_TYPE);
                let _ = reply.extend_from_slice(&FIRMWARE_VERSION);
            }
            Command::Measure { channel, reference } => {
                let value = average(&mut self.adc, channel, reference);
                let _ = reply.extend_from_slice(&format_decimal(value));
            }
            Command::SetReadDelay(Some(ticks)) => {
                let outcome = match self.store.set_read_delay(ticks) {
                    Ok(()) => REPLY_OK,
                    Err(e) => {
                        warn!("response timeout write failed: {}", e);
                        REPLY_NO
                    }
                };
                let _ = reply.extend_from_slice(outcome);
            }
            Command::SetReadDelay(None) => {
                let _ = reply.extend_from_slice(REPLY_NO);
            }
            Command::ReadDelay => match self.store.read_delay() {
                Ok(ticks) => push_number(&mut reply, ticks),
                Err(e) => warn!("response timeout read failed: {}", e),
            },
            Command::LastDelay => push_number(&mut reply, self.stats.last),
            Command::MaxDelay => {
                let max = self.stats.take_max();
                push_number(&mut reply, max);
            }
            Command::ResetBus => {
                self.reset_bus();
                let _ = reply.extend_from_slice(REPLY_DONE);
            }
            Command::Unknown => {}
        }
        let _ = reply.push(CR);
        reply
    }

    fn reset_bus(&mut self) {
        let _ = self.power.set_low();
        self.bus.hold_reset(true);
        self.delay.delay_ms(RESET_PULSE_MS);
        self.bus.hold_reset(false);
        let _ = self.power.set_high();
    }

    fn relay(&mut self, frame: &CommandFrame) -> Result<(WaitOutcome, Verdict), GatewayError> {
        let timeout = self.store.read_delay().unwrap_or_else(|e| {
            warn!("response timeout read failed: {}", e);
            DEFAULT_READ_DELAY
        });

        let _ = self.power.set_low();
        self.bus.begin_relay();
        for &byte in frame.iter() {
            self.bus.transmit(byte);
        }
        self.bus.release();
        self.delay.delay_ns(DEAD_TIME_NS);
        self.bus.listen();

        let wait = collect(&mut self.bus, timeout, &mut self.stats);
        let mut response = self.bus.finish();
        let verdict = reconcile(&mut response);
        if response.is_empty() {
            let _ = response.push(NODE_ID);
            let _ = response.push(CR);
        }

        self.bus.release();
        let _ = self.power.set_high();
        debug!(
            "relay ended {:?} with {:?} after {} polls",
            wait, verdict, self.stats.last
        );

        self.reply(&response)?;
        Ok((wait, verdict))
    }

    fn reply(&mut self, response: &[u8]) -> Result<(), GatewayError> {
        for &byte in response.iter().chain(core::iter::once(&LF)) {
            block!(self.host.write(byte)).map_err(|e| GatewayError::HostLink(e.kind()))?;
        }
        block!(self.host.flush()).map_err(|e| GatewayError::HostLink(e.kind()))
    }
}
