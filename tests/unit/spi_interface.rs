//! Unit tests for the SPI transport with truth-table chip selection

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::{Error as SpiErrorTrait, ErrorKind, ErrorType, SpiBus};
use icm20948_multi::{BusInterface, ChipSelector, SelectBusError, SpiSelectInterface};
use std::cell::RefCell;
use std::rc::Rc;

/// Everything observable on the bus, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Pin { id: usize, level: bool },
    Transfer(Vec<u8>),
}

type Log = Rc<RefCell<Vec<Event>>>;

#[derive(Clone)]
struct LogPin {
    id: usize,
    log: Log,
}

impl PinErrorType for LogPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for LogPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Pin {
            id: self.id,
            level: false,
        });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Pin {
            id: self.id,
            level: true,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LogSpiError;

impl SpiErrorTrait for LogSpiError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

struct LogSpi {
    log: Log,
    response: Vec<u8>,
    fail_next: bool,
}

impl ErrorType for LogSpi {
    type Error = LogSpiError;
}

impl SpiBus<u8> for LogSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Transfer(words.to_vec()));
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Transfer(write.to_vec()));
        read.fill(0);
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        if self.fail_next {
            self.fail_next = false;
            return Err(LogSpiError);
        }
        self.log.borrow_mut().push(Event::Transfer(words.to_vec()));
        for (word, response) in words.iter_mut().zip(self.response.iter()) {
            *word = *response;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn make_interface(
    response: Vec<u8>,
    fail_next: bool,
) -> (SpiSelectInterface<LogSpi, LogPin, 3>, Log) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let pins: [LogPin; 3] = core::array::from_fn(|id| LogPin {
        id,
        log: Rc::clone(&log),
    });
    let cs = ChipSelector::new(pins, [false, true, false]);
    let spi = LogSpi {
        log: Rc::clone(&log),
        response,
        fail_next,
    };
    (SpiSelectInterface::new(spi, cs), log)
}

#[test]
fn test_transfer_is_bracketed_by_select_pattern() {
    let (mut interface, log) = make_interface(vec![0, 0], false);

    let mut buf = [0x80, 0x00];
    interface.transfer_in_place(&mut buf).unwrap();

    let events = log.borrow().clone();
    assert_eq!(
        events,
        vec![
            Event::Pin { id: 0, level: false },
            Event::Pin { id: 1, level: true },
            Event::Pin { id: 2, level: false },
            Event::Transfer(vec![0x80, 0x00]),
            Event::Pin { id: 0, level: true },
            Event::Pin { id: 1, level: true },
            Event::Pin { id: 2, level: true },
        ]
    );
}

#[test]
fn test_received_bytes_replace_the_buffer() {
    let (mut interface, _log) = make_interface(vec![0xAA, 0xBB, 0xCC], false);

    let mut buf = [0x80, 0x00, 0x00];
    interface.transfer_in_place(&mut buf).unwrap();
    assert_eq!(buf, [0xAA, 0xBB, 0xCC]);
}

#[test]
fn test_release_happens_on_the_failure_path_too() {
    let (mut interface, log) = make_interface(Vec::new(), true);

    let mut buf = [0x00, 0x01];
    let result = interface.transfer_in_place(&mut buf);
    assert_eq!(result, Err(SelectBusError::Spi(LogSpiError)));

    // The select pattern was asserted and then fully restored to idle even
    // though the transfer never happened.
    let events = log.borrow().clone();
    assert_eq!(
        events,
        vec![
            Event::Pin { id: 0, level: false },
            Event::Pin { id: 1, level: true },
            Event::Pin { id: 2, level: false },
            Event::Pin { id: 0, level: true },
            Event::Pin { id: 1, level: true },
            Event::Pin { id: 2, level: true },
        ]
    );
}

#[test]
fn test_consecutive_transactions_never_overlap_selection() {
    let (mut interface, log) = make_interface(vec![0, 0], false);

    let mut first = [0x00, 0x11];
    let mut second = [0x80, 0x00];
    interface.transfer_in_place(&mut first).unwrap();
    interface.transfer_in_place(&mut second).unwrap();

    // Between the two transfers every line went back to idle
    let events = log.borrow().clone();
    let transfer_indices: Vec<usize> = events
        .iter()
        .enumerate()
        .filter_map(|(i, e)| matches!(e, Event::Transfer(_)).then_some(i))
        .collect();
    assert_eq!(transfer_indices.len(), 2);

    let between = &events[transfer_indices[0] + 1..transfer_indices[1]];
    let idle_restores = between
        .iter()
        .filter(|e| matches!(e, Event::Pin { level: true, .. }))
        .count();
    assert!(idle_restores >= 3, "all three lines must return to idle");
}
