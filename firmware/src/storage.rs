//! Click counter persisted in the last flash page.
//!
//! The page is used as an append log of 8-byte records so a counter update
//! costs one double-word program; the page is erased only when full. A
//! record holds the value and its complement, which tells a torn or
//! foreign write from a real one.

use embassy_stm32::flash::{Blocking, Flash};
use flashlight_core::platform::{CounterStore, StoreError};

/// Offset of the last 2 KiB page of the 512 KiB bank.
const PAGE_OFFSET: u32 = 0x7_F800;
const PAGE_SIZE: u32 = 2048;
/// Flash programs in double words.
const RECORD_SIZE: u32 = 8;
const RECORD_COUNT: u32 = PAGE_SIZE / RECORD_SIZE;
const ERASED: u8 = 0xFF;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Slot {
    Blank,
    Value(u8),
    Corrupt,
}

fn decode(record: &[u8; RECORD_SIZE as usize]) -> Slot {
    if record.iter().all(|byte| *byte == ERASED) {
        Slot::Blank
    } else if record[0] == !record[1] {
        Slot::Value(record[0])
    } else {
        Slot::Corrupt
    }
}

pub struct FlashCounterStore {
    flash: Flash<'static, Blocking>,
}

impl FlashCounterStore {
    pub const fn new(flash: Flash<'static, Blocking>) -> Self {
        Self { flash }
    }

    fn read_slot(&mut self, index: u32) -> Result<Slot, StoreError> {
        let mut record = [0_u8; RECORD_SIZE as usize];
        self.flash
            .blocking_read(PAGE_OFFSET + index * RECORD_SIZE, &mut record)
            .map_err(|_| StoreError::Read)?;
        Ok(decode(&record))
    }

    /// Index of the first blank record, or `None` when the page is full.
    fn next_free(&mut self) -> Result<Option<u32>, StoreError> {
        for index in 0..RECORD_COUNT {
            if self.read_slot(index)? == Slot::Blank {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

impl CounterStore for FlashCounterStore {
    fn load(&mut self) -> Result<u8, StoreError> {
        let mut latest = Err(StoreError::Blank);
        for index in 0..RECORD_COUNT {
            match self.read_slot(index)? {
                Slot::Blank => break,
                Slot::Value(value) => latest = Ok(value),
                Slot::Corrupt => latest = Err(StoreError::Read),
            }
        }
        latest
    }

    fn save(&mut self, value: u8) -> Result<(), StoreError> {
        let index = match self.next_free()? {
            Some(index) => index,
            None => {
                self.flash
                    .blocking_erase(PAGE_OFFSET, PAGE_OFFSET + PAGE_SIZE)
                    .map_err(|_| StoreError::Write)?;
                0
            }
        };
        let mut record = [ERASED; RECORD_SIZE as usize];
        record[0] = value;
        record[1] = !value;
        self.flash
            .blocking_write(PAGE_OFFSET + index * RECORD_SIZE, &record)
            .map_err(|_| StoreError::Write)
    }
}
