//! SPI interface implementation built on top of `embedded-hal` `SpiBus`.
//!
//! The PMW3360 needs waits *inside* a chip-select span (tSRAD between the
//! address and the data byte, tBEXIT-style gaps between SROM bytes), so the
//! chip-select line is driven here rather than through a `SpiDevice`.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Mode, SpiBus, MODE_3};

use super::pins::PinMux;
use super::Pmw3360Interface;
use crate::registers::{ADDRESS_MASK, WRITE_BIT};
use crate::timing::Timing;

/// Clock polarity and phase expected by the sensor (CPOL = 1, CPHA = 1, MSB first).
pub const SPI_MODE: Mode = MODE_3;
/// Conservative clock rate for short cable runs.
pub const SPI_FREQUENCY_HZ: u32 = 500_000;

/// Errors surfaced by [`SpiInterface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<S, P, M> {
    /// The SPI bus reported an error.
    Spi(S),
    /// Driving the chip-select line failed.
    ChipSelect(P),
    /// Reassigning the shared pads failed.
    PinMux(M),
}

/// SPI-based interface implementation for the PMW3360 driver.
///
/// Every write is flushed before the following wait or chip-select edge, so
/// the protocol delays are measured from the end of the last clocked bit.
pub struct SpiInterface<SPI, CS, MUX, D> {
    spi: SPI,
    cs: CS,
    mux: MUX,
    delay: D,
    timing: Timing,
}

impl<SPI, CS, MUX, D> SpiInterface<SPI, CS, MUX, D> {
    /// Creates a new interface from the bus, chip-select line, pad mux and delay source.
    ///
    /// The chip-select line is expected to idle high; [`Pmw3360Interface::resync`]
    /// establishes that state during bring-up.
    pub const fn new(spi: SPI, cs: CS, mux: MUX, delay: D, timing: Timing) -> Self {
        Self {
            spi,
            cs,
            mux,
            delay,
            timing,
        }
    }

    /// Builds the address byte for a transaction.
    fn command_byte(register: u8, is_write: bool) -> u8 {
        let command = register & ADDRESS_MASK;
        if is_write {
            command | WRITE_BIT
        } else {
            command
        }
    }

    /// Provides mutable access to the wrapped SPI bus.
    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Consumes the interface and returns the owned parts.
    pub fn release(self) -> (SPI, CS, MUX, D) {
        (self.spi, self.cs, self.mux, self.delay)
    }
}

impl<SPI, CS, MUX, D> SpiInterface<SPI, CS, MUX, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    MUX: PinMux,
    D: DelayNs,
{
    fn select(&mut self) -> core::result::Result<(), BusError<SPI::Error, CS::Error, MUX::Error>> {
        self.delay.delay_ns(self.timing.cs_settle_ns);
        self.cs.set_low().map_err(BusError::ChipSelect)?;
        self.delay.delay_ns(self.timing.cs_settle_ns);
        Ok(())
    }

    fn deselect(
        &mut self,
    ) -> core::result::Result<(), BusError<SPI::Error, CS::Error, MUX::Error>> {
        self.delay.delay_ns(self.timing.cs_settle_ns);
        self.cs.set_high().map_err(BusError::ChipSelect)?;
        self.delay.delay_ns(self.timing.cs_settle_ns);
        Ok(())
    }

    /// Runs `exchange` inside one chip-select span.
    ///
    /// Chip-select is released even if the exchange fails so the line never
    /// stays asserted between transactions.
    /// Writes `words` and waits until they have left the shift register.
    fn send(
        &mut self,
        words: &[u8],
    ) -> core::result::Result<(), BusError<SPI::Error, CS::Error, MUX::Error>> {
        self.spi.write(words).map_err(BusError::Spi)?;
        self.spi.flush().map_err(BusError::Spi)
    }

    fn framed<T>(
        &mut self,
        hold_us: u32,
        recovery_us: u32,
        exchange: impl FnOnce(
            &mut Self,
        ) -> core::result::Result<T, BusError<SPI::Error, CS::Error, MUX::Error>>,
    ) -> core::result::Result<T, BusError<SPI::Error, CS::Error, MUX::Error>> {
        self.select()?;
        let outcome = exchange(self);
        self.delay.delay_us(hold_us);
        let deselected = self.deselect();
        self.delay.delay_us(recovery_us);
        let value = outcome?;
        deselected?;
        Ok(value)
    }
}

impl<SPI, CS, MUX, D> Pmw3360Interface for SpiInterface<SPI, CS, MUX, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    MUX: PinMux,
    D: DelayNs,
{
    type Error = BusError<SPI::Error, CS::Error, MUX::Error>;

    fn read_register(&mut self, register: u8) -> core::result::Result<u8, Self::Error> {
        let Timing {
            read_address_us,
            read_hold_us,
            read_recovery_us,
            ..
        } = self.timing;

        self.framed(read_hold_us, read_recovery_us, |iface| {
            iface.send(&[Self::command_byte(register, false)])?;
            iface.delay.delay_us(read_address_us);

            let mut value = [0u8; 1];
            iface.spi.read(&mut value).map_err(BusError::Spi)?;
            Ok(value[0])
        })
    }

    fn write_register(&mut self, register: u8, value: u8) -> core::result::Result<(), Self::Error> {
        let Timing {
            write_hold_us,
            write_recovery_us,
            ..
        } = self.timing;

        self.framed(write_hold_us, write_recovery_us, |iface| {
            iface.send(&[Self::command_byte(register, true), value])
        })
    }

    fn burst_write(&mut self, register: u8, data: &[u8]) -> core::result::Result<(), Self::Error> {
        let Timing {
            burst_byte_us,
            burst_exit_us,
            ..
        } = self.timing;

        self.framed(0, burst_exit_us, |iface| {
            iface.send(&[Self::command_byte(register, true)])?;
            iface.delay.delay_us(burst_byte_us);

            for byte in data {
                iface.send(core::slice::from_ref(byte))?;
                iface.delay.delay_us(burst_byte_us);
            }
            Ok(())
        })
    }

    fn resync(&mut self) -> core::result::Result<(), Self::Error> {
        self.deselect()?;
        self.select()?;
        self.deselect()
    }

    fn claim_pins(&mut self) -> core::result::Result<(), Self::Error> {
        self.mux.claim().map_err(BusError::PinMux)
    }

    fn release_pins(&mut self) -> core::result::Result<(), Self::Error> {
        self.mux.release().map_err(BusError::PinMux)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn timing(&self) -> &Timing {
        &self.timing
    }
}

#[cfg(test)]
mod tests {
    use super::{BusError, SpiInterface};
    use crate::interface::pins::{Dedicated, PinMux};
    use crate::interface::Pmw3360Interface;
    use crate::timing::Timing;
    use core::cell::RefCell;
    use core::convert::Infallible;
    use embedded_hal::delay::DelayNs;
    use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
    use embedded_hal::spi::{ErrorKind, ErrorType as SpiErrorType, SpiBus};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
    use std::rc::Rc;

    #[test]
    fn read_register_clears_direction_bit() {
        let spi_expectations: [SpiTransaction<u8>; 3] = [
            SpiTransaction::write_vec(vec![0x02]),
            SpiTransaction::flush(),
            SpiTransaction::read_vec(vec![0x88]),
        ];
        let pin_expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ];
        let mut spi = SpiMock::new(&spi_expectations);
        let mut cs = PinMock::new(&pin_expectations);
        let mut interface =
            SpiInterface::new(spi.clone(), cs.clone(), Dedicated, NoopDelay, Timing::DATASHEET);

        assert_eq!(interface.read_register(0x82).unwrap(), 0x88);

        spi.done();
        cs.done();
    }

    #[test]
    fn write_register_sets_direction_bit_and_sends_payload() {
        let spi_expectations: [SpiTransaction<u8>; 2] = [
            SpiTransaction::write_vec(vec![0xBA, 0x5A]),
            SpiTransaction::flush(),
        ];
        let pin_expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ];
        let mut spi = SpiMock::new(&spi_expectations);
        let mut cs = PinMock::new(&pin_expectations);
        let mut interface =
            SpiInterface::new(spi.clone(), cs.clone(), Dedicated, NoopDelay, Timing::DATASHEET);

        interface.write_register(0x3A, 0x5A).unwrap();

        spi.done();
        cs.done();
    }

    #[test]
    fn burst_write_streams_every_byte_under_one_select() {
        let spi_expectations: [SpiTransaction<u8>; 8] = [
            SpiTransaction::write_vec(vec![0xE2]),
            SpiTransaction::flush(),
            SpiTransaction::write_vec(vec![0x01]),
            SpiTransaction::flush(),
            SpiTransaction::write_vec(vec![0x04]),
            SpiTransaction::flush(),
            SpiTransaction::write_vec(vec![0x8E]),
            SpiTransaction::flush(),
        ];
        let pin_expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ];
        let mut spi = SpiMock::new(&spi_expectations);
        let mut cs = PinMock::new(&pin_expectations);
        let mut interface =
            SpiInterface::new(spi.clone(), cs.clone(), Dedicated, NoopDelay, Timing::DATASHEET);

        interface.burst_write(0x62, &[0x01, 0x04, 0x8E]).unwrap();

        spi.done();
        cs.done();
    }

    #[test]
    fn resync_toggles_chip_select_without_data() {
        let spi_expectations: [SpiTransaction<u8>; 0] = [];
        let pin_expectations = [
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ];
        let mut spi = SpiMock::new(&spi_expectations);
        let mut cs = PinMock::new(&pin_expectations);
        let mut interface =
            SpiInterface::new(spi.clone(), cs.clone(), Dedicated, NoopDelay, Timing::DATASHEET);

        interface.resync().unwrap();

        spi.done();
        cs.done();
    }

    // Shared recorder so bus bytes, chip-select edges and waits interleave in
    // one timeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Select,
        Deselect,
        Tx(u8),
        Flush,
        Rx(u8),
        WaitNs(u32),
        WaitUs(u32),
        WaitMs(u32),
        Claim,
        Release,
    }

    type Trace = Rc<RefCell<Vec<Event>>>;

    struct RecordingSpi {
        trace: Trace,
        response: u8,
        fail_writes: bool,
    }

    impl SpiErrorType for RecordingSpi {
        type Error = ErrorKind;
    }

    impl SpiBus for RecordingSpi {
        fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            for word in words.iter_mut() {
                *word = self.response;
                self.trace.borrow_mut().push(Event::Rx(self.response));
            }
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
            if self.fail_writes {
                return Err(ErrorKind::Other);
            }
            for word in words {
                self.trace.borrow_mut().push(Event::Tx(*word));
            }
            Ok(())
        }

        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
            self.write(write)?;
            self.read(read)
        }

        fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            let copy: Vec<u8> = words.to_vec();
            self.transfer(words, &copy)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.trace.borrow_mut().push(Event::Flush);
            Ok(())
        }
    }

    struct RecordingCs {
        trace: Trace,
    }

    impl PinErrorType for RecordingCs {
        type Error = Infallible;
    }

    impl OutputPin for RecordingCs {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.trace.borrow_mut().push(Event::Select);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.trace.borrow_mut().push(Event::Deselect);
            Ok(())
        }
    }

    struct RecordingMux {
        trace: Trace,
    }

    impl PinMux for RecordingMux {
        type Error = Infallible;

        fn claim(&mut self) -> Result<(), Self::Error> {
            self.trace.borrow_mut().push(Event::Claim);
            Ok(())
        }

        fn release(&mut self) -> Result<(), Self::Error> {
            self.trace.borrow_mut().push(Event::Release);
            Ok(())
        }
    }

    struct VirtualClock {
        trace: Trace,
    }

    impl DelayNs for VirtualClock {
        fn delay_ns(&mut self, ns: u32) {
            self.trace.borrow_mut().push(Event::WaitNs(ns));
        }

        fn delay_us(&mut self, us: u32) {
            self.trace.borrow_mut().push(Event::WaitUs(us));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.trace.borrow_mut().push(Event::WaitMs(ms));
        }
    }

    fn recording_interface(
        response: u8,
        fail_writes: bool,
    ) -> (
        SpiInterface<RecordingSpi, RecordingCs, RecordingMux, VirtualClock>,
        Trace,
    ) {
        let trace: Trace = Rc::new(RefCell::new(Vec::new()));
        let interface = SpiInterface::new(
            RecordingSpi {
                trace: trace.clone(),
                response,
                fail_writes,
            },
            RecordingCs {
                trace: trace.clone(),
            },
            RecordingMux {
                trace: trace.clone(),
            },
            VirtualClock {
                trace: trace.clone(),
            },
            Timing::DATASHEET,
        );
        (interface, trace)
    }

    #[test]
    fn read_register_applies_timing_zones_in_order() {
        let (mut interface, trace) = recording_interface(0x42, false);

        assert_eq!(interface.read_register(0x00).unwrap(), 0x42);

        assert_eq!(
            *trace.borrow(),
            [
                Event::WaitNs(120),
                Event::Select,
                Event::WaitNs(120),
                Event::Tx(0x00),
                Event::Flush,
                Event::WaitUs(100),
                Event::Rx(0x42),
                Event::WaitUs(1),
                Event::WaitNs(120),
                Event::Deselect,
                Event::WaitNs(120),
                Event::WaitUs(19),
            ]
        );
    }

    #[test]
    fn write_register_holds_select_across_both_bytes() {
        let (mut interface, trace) = recording_interface(0x00, false);

        interface.write_register(0x0F, 0x15).unwrap();

        assert_eq!(
            *trace.borrow(),
            [
                Event::WaitNs(120),
                Event::Select,
                Event::WaitNs(120),
                Event::Tx(0x8F),
                Event::Tx(0x15),
                Event::Flush,
                Event::WaitUs(20),
                Event::WaitNs(120),
                Event::Deselect,
                Event::WaitNs(120),
                Event::WaitUs(100),
            ]
        );
    }

    #[test]
    fn burst_write_spaces_bytes() {
        let (mut interface, trace) = recording_interface(0x00, false);

        interface.burst_write(0x62, &[0xAA, 0xBB]).unwrap();

        let trace = trace.borrow();
        let bus: Vec<Event> = trace
            .iter()
            .copied()
            .filter(|event| !matches!(event, Event::WaitNs(_)))
            .collect();
        assert_eq!(
            bus,
            [
                Event::Select,
                Event::Tx(0xE2),
                Event::Flush,
                Event::WaitUs(15),
                Event::Tx(0xAA),
                Event::Flush,
                Event::WaitUs(15),
                Event::Tx(0xBB),
                Event::Flush,
                Event::WaitUs(15),
                Event::WaitUs(0),
                Event::Deselect,
                Event::WaitUs(1),
            ]
        );
    }

    #[test]
    fn chip_select_is_released_when_the_bus_fails() {
        let (mut interface, trace) = recording_interface(0x00, true);

        let err = interface.write_register(0x0F, 0x15).unwrap_err();
        assert_eq!(err, BusError::Spi(ErrorKind::Other));

        let edges: Vec<Event> = trace
            .borrow()
            .iter()
            .copied()
            .filter(|event| matches!(event, Event::Select | Event::Deselect))
            .collect();
        assert_eq!(edges, [Event::Select, Event::Deselect]);
    }

    #[test]
    fn chip_select_never_asserts_twice_in_a_row() {
        let (mut interface, trace) = recording_interface(0x00, false);

        interface.resync().unwrap();
        interface.write_register(0x3A, 0x5A).unwrap();
        interface.read_register(0x02).unwrap();
        interface.burst_write(0x62, &[0x01]).unwrap();

        let mut selected = false;
        for event in trace.borrow().iter() {
            match event {
                Event::Select => {
                    assert!(!selected, "chip-select asserted twice");
                    selected = true;
                }
                Event::Deselect => selected = false,
                Event::Tx(_) | Event::Rx(_) => assert!(selected, "data outside select"),
                _ => {}
            }
        }
        assert!(!selected);
    }

    #[test]
    fn writes_drain_before_any_wait_or_chip_select_edge() {
        let (mut interface, trace) = recording_interface(0x00, false);

        interface.write_register(0x3A, 0x5A).unwrap();
        interface.read_register(0x02).unwrap();
        interface.burst_write(0x62, &[0x01, 0x04, 0x8E]).unwrap();

        let mut in_flight = false;
        for event in trace.borrow().iter() {
            match event {
                Event::Tx(_) => in_flight = true,
                Event::Flush => in_flight = false,
                Event::Rx(_) => {}
                _ => assert!(!in_flight, "{event:?} while a write is still shifting"),
            }
        }
        assert!(!in_flight);
    }

    #[test]
    fn pin_claim_is_forwarded_to_the_mux() {
        let (mut interface, trace) = recording_interface(0x00, false);

        interface.claim_pins().unwrap();
        interface.release_pins().unwrap();
        interface.delay_ms(50);

        assert_eq!(
            *trace.borrow(),
            [Event::Claim, Event::Release, Event::WaitMs(50)]
        );
    }
}
