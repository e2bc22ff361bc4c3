//! Byte addressable persistent storage for the persistent macro slots.
//!
//! The persistent slots are written byte by byte through [`embedded_storage::Storage`],
//! writes are not durable until [`Eeprom::commit`] is called.
use core::convert::Infallible;

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use embedded_storage::{ReadStorage, Storage};

/// Value of an erased byte
pub const ERASED_BYTE: u8 = 0xFF;

/// Byte storage with an explicit commit step
pub trait Eeprom: Storage {
    /// Make all previous writes durable
    fn commit(&mut self) -> Result<(), Self::Error>;
}

/// Errors of the eeprom backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EepromError<E> {
    /// Error of the underlying flash
    Flash(E),
    /// Access beyond the end of the eeprom
    OutOfBounds,
    /// The eeprom doesn't fit the write or erase granularity of the flash
    NotAligned,
}

fn check_bounds<E>(offset: u32, len: usize, capacity: usize) -> Result<usize, EepromError<E>> {
    let start = offset as usize;
    match start.checked_add(len) {
        Some(end) if end <= capacity => Ok(start),
        _ => Err(EepromError::OutOfBounds),
    }
}

/// Eeprom in RAM, for keyboards without flash storage.
///
/// The content is lost on power-down, `commit` does nothing.
pub struct RamEeprom<const SIZE: usize> {
    data: [u8; SIZE],
}

impl<const SIZE: usize> Default for RamEeprom<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> RamEeprom<SIZE> {
    pub const fn new() -> Self {
        Self {
            data: [ERASED_BYTE; SIZE],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl<const SIZE: usize> ReadStorage for RamEeprom<SIZE> {
    type Error = EepromError<Infallible>;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = check_bounds(offset, bytes.len(), SIZE)?;
        bytes.copy_from_slice(&self.data[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        SIZE
    }
}

impl<const SIZE: usize> Storage for RamEeprom<SIZE> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let start = check_bounds(offset, bytes.len(), SIZE)?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

impl<const SIZE: usize> Eeprom for RamEeprom<SIZE> {
    fn commit(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Eeprom emulated on a range of NOR flash.
///
/// The whole content is mirrored in RAM. Writes only change the mirror,
/// `commit` erases the flash range and programs the mirror back.
pub struct FlashEeprom<F: NorFlash, const SIZE: usize> {
    flash: F,
    /// Start of the eeprom range in the flash, aligned to `F::ERASE_SIZE`
    flash_offset: u32,
    mirror: [u8; SIZE],
    dirty: bool,
}

impl<F: NorFlash, const SIZE: usize> FlashEeprom<F, SIZE> {
    /// Create the eeprom at `flash_offset` and load its content from the flash
    pub fn new(mut flash: F, flash_offset: u32) -> Result<Self, EepromError<F::Error>> {
        if F::ERASE_SIZE == 0
            || flash_offset as usize % F::ERASE_SIZE != 0
            || (F::WRITE_SIZE > 1 && SIZE % F::WRITE_SIZE != 0)
            || (F::READ_SIZE > 1 && SIZE % F::READ_SIZE != 0)
        {
            error!("Eeprom of {} bytes at {} is not aligned to the flash", SIZE, flash_offset);
            return Err(EepromError::NotAligned);
        }
        check_bounds::<F::Error>(flash_offset, Self::erase_len(), ReadNorFlash::capacity(&flash))?;

        let mut mirror = [ERASED_BYTE; SIZE];
        ReadNorFlash::read(&mut flash, flash_offset, &mut mirror).map_err(EepromError::Flash)?;
        debug!("Loaded {} bytes of eeprom from flash offset {}", SIZE, flash_offset);

        Ok(Self {
            flash,
            flash_offset,
            mirror,
            dirty: false,
        })
    }

    /// Whether there are writes which are not committed yet
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Release the flash, uncommitted writes are lost
    pub fn release(self) -> F {
        self.flash
    }

    fn erase_len() -> usize {
        SIZE.div_ceil(F::ERASE_SIZE.max(1)) * F::ERASE_SIZE
    }
}

impl<F: NorFlash, const SIZE: usize> ReadStorage for FlashEeprom<F, SIZE> {
    type Error = EepromError<F::Error>;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = check_bounds(offset, bytes.len(), SIZE)?;
        bytes.copy_from_slice(&self.mirror[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        SIZE
    }
}

impl<F: NorFlash, const SIZE: usize> Storage for FlashEeprom<F, SIZE> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let start = check_bounds(offset, bytes.len(), SIZE)?;
        let target = &mut self.mirror[start..start + bytes.len()];
        if target != bytes {
            target.copy_from_slice(bytes);
            self.dirty = true;
        }
        Ok(())
    }
}

impl<F: NorFlash, const SIZE: usize> Eeprom for FlashEeprom<F, SIZE> {
    fn commit(&mut self) -> Result<(), Self::Error> {
        if !self.dirty {
            return Ok(());
        }
        let erase_end = self.flash_offset + Self::erase_len() as u32;
        NorFlash::erase(&mut self.flash, self.flash_offset, erase_end).map_err(EepromError::Flash)?;
        NorFlash::write(&mut self.flash, self.flash_offset, &self.mirror).map_err(EepromError::Flash)?;
        self.dirty = false;
        info!("Committed {} bytes of eeprom to flash", SIZE);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use embedded_storage::nor_flash::{ErrorType, NorFlashErrorKind};

    use super::*;

    /// 4 pages of 64 bytes, counts the erase operations
    struct MockFlash {
        data: [u8; 256],
        erase_count: usize,
    }

    impl MockFlash {
        fn new() -> Self {
            Self {
                data: [ERASED_BYTE; 256],
                erase_count: 0,
            }
        }
    }

    impl ErrorType for MockFlash {
        type Error = NorFlashErrorKind;
    }

    impl ReadNorFlash for MockFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            if start + bytes.len() > self.data.len() {
                return Err(NorFlashErrorKind::OutOfBounds);
            }
            bytes.copy_from_slice(&self.data[start..start + bytes.len()]);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.data.len()
        }
    }

    impl NorFlash for MockFlash {
        const WRITE_SIZE: usize = 4;
        const ERASE_SIZE: usize = 64;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            self.data[from as usize..to as usize].fill(ERASED_BYTE);
            self.erase_count += 1;
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            for (dst, src) in self.data[start..start + bytes.len()].iter_mut().zip(bytes) {
                // NOR flash can only clear bits
                *dst &= *src;
            }
            Ok(())
        }
    }

    #[test]
    fn test_ram_eeprom_bounds() {
        let mut eeprom = RamEeprom::<8>::new();
        assert_eq!(eeprom.write(6, &[1, 2]), Ok(()));
        assert_eq!(eeprom.write(7, &[1, 2]), Err(EepromError::OutOfBounds));
        let mut buf = [0; 3];
        assert_eq!(eeprom.read(5, &mut buf), Ok(()));
        assert_eq!(buf, [ERASED_BYTE, 1, 2]);
        assert_eq!(eeprom.read(u32::MAX, &mut buf), Err(EepromError::OutOfBounds));
    }

    #[test]
    fn test_flash_eeprom_commit() {
        let mut eeprom = FlashEeprom::<_, 96>::new(MockFlash::new(), 64).unwrap();
        eeprom.write(10, &[0x12, 0x34]).unwrap();
        assert!(eeprom.is_dirty());

        // Nothing reaches the flash before commit
        let flash = &eeprom.flash;
        assert_eq!(flash.data[64 + 10], ERASED_BYTE);

        eeprom.commit().unwrap();
        assert!(!eeprom.is_dirty());
        let flash = eeprom.release();
        assert_eq!(&flash.data[74..76], &[0x12, 0x34]);
        assert_eq!(flash.erase_count, 1);

        // Reload from flash
        let mut eeprom = FlashEeprom::<_, 96>::new(flash, 64).unwrap();
        let mut buf = [0; 2];
        eeprom.read(10, &mut buf).unwrap();
        assert_eq!(buf, [0x12, 0x34]);

        // Unchanged content doesn't erase the flash again
        eeprom.write(10, &[0x12, 0x34]).unwrap();
        eeprom.commit().unwrap();
        assert_eq!(eeprom.release().erase_count, 1);
    }

    #[test]
    fn test_flash_eeprom_alignment() {
        assert!(matches!(
            FlashEeprom::<_, 96>::new(MockFlash::new(), 10),
            Err(EepromError::NotAligned)
        ));
        assert!(matches!(
            FlashEeprom::<_, 95>::new(MockFlash::new(), 0),
            Err(EepromError::NotAligned)
        ));
        assert!(matches!(
            FlashEeprom::<_, 96>::new(MockFlash::new(), 192),
            Err(EepromError::OutOfBounds)
        ));
    }
}
