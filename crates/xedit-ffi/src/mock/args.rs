//! Typed access to argument slots inside the mock engine.

use xedit_core::XEditError;

use crate::arg::NativeArg;
use crate::catalog::NativeFn;
use crate::strings::from_wide_lossy;

/// Why a mock call did not succeed.
#[derive(Debug)]
pub(crate) enum Fault {
    /// The engine refused; reported through the success flag and side channel.
    Engine(String),
    /// The host passed something the engine could not even read.
    Host(XEditError),
}

impl From<XEditError> for Fault {
    fn from(e: XEditError) -> Self {
        Fault::Host(e)
    }
}

pub(crate) type Outcome<T = ()> = Result<T, Fault>;

pub(crate) fn refuse<T>(message: impl Into<String>) -> Outcome<T> {
    Err(Fault::Engine(message.into()))
}

pub(crate) trait OrRefuse<T> {
    fn or_refuse(self, message: impl FnOnce() -> String) -> Outcome<T>;
}

impl<T> OrRefuse<T> for Option<T> {
    fn or_refuse(self, message: impl FnOnce() -> String) -> Outcome<T> {
        self.ok_or_else(|| Fault::Engine(message()))
    }
}

pub(crate) struct Args<'s, 'a> {
    func: NativeFn,
    slots: &'s mut [NativeArg<'a>],
}

impl<'s, 'a> Args<'s, 'a> {
    pub(crate) fn new(func: NativeFn, slots: &'s mut [NativeArg<'a>]) -> Self {
        Self { func, slots }
    }

    fn mismatch(&self, index: usize, expected: &str) -> Fault {
        Fault::Host(XEditError::ArgumentMismatch {
            operation: self.func.name(),
            detail: format!("slot {index} is not {expected}"),
        })
    }

    pub(crate) fn handle(&self, index: usize) -> Outcome<u32> {
        match self.slots.get(index) {
            Some(NativeArg::Handle(h)) => Ok(h.raw()),
            _ => Err(self.mismatch(index, "a handle")),
        }
    }

    pub(crate) fn text(&self, index: usize) -> Outcome<String> {
        match self.slots.get(index) {
            Some(NativeArg::Str(s)) => Ok(from_wide_lossy(s)),
            _ => Err(self.mismatch(index, "a string")),
        }
    }

    pub(crate) fn integer(&self, index: usize) -> Outcome<i32> {
        match self.slots.get(index) {
            Some(NativeArg::Integer(v)) => Ok(*v),
            _ => Err(self.mismatch(index, "an integer")),
        }
    }

    pub(crate) fn cardinal(&self, index: usize) -> Outcome<u32> {
        match self.slots.get(index) {
            Some(NativeArg::Cardinal(v)) => Ok(*v),
            _ => Err(self.mismatch(index, "a cardinal")),
        }
    }

    pub(crate) fn double(&self, index: usize) -> Outcome<f64> {
        match self.slots.get(index) {
            Some(NativeArg::Double(v)) => Ok(*v),
            _ => Err(self.mismatch(index, "a double")),
        }
    }

    pub(crate) fn boolean(&self, index: usize) -> Outcome<bool> {
        match self.slots.get(index) {
            Some(NativeArg::Bool(v)) => Ok(*v),
            _ => Err(self.mismatch(index, "a bool")),
        }
    }

    // ========================================================================
    // Outputs
    // ========================================================================

    pub(crate) fn put_cardinal(&mut self, index: usize, value: u32) -> Outcome {
        match self.slots.get_mut(index) {
            Some(NativeArg::OutCardinal(slot)) => {
                **slot = value;
                Ok(())
            }
            _ => Err(self.mismatch(index, "a cardinal output")),
        }
    }

    pub(crate) fn put_integer(&mut self, index: usize, value: i32) -> Outcome {
        match self.slots.get_mut(index) {
            Some(NativeArg::OutInteger(slot)) => {
                **slot = value;
                Ok(())
            }
            _ => Err(self.mismatch(index, "an integer output")),
        }
    }

    pub(crate) fn put_byte(&mut self, index: usize, value: u8) -> Outcome {
        match self.slots.get_mut(index) {
            Some(NativeArg::OutByte(slot)) => {
                **slot = value;
                Ok(())
            }
            _ => Err(self.mismatch(index, "a byte output")),
        }
    }

    pub(crate) fn put_bool(&mut self, index: usize, value: bool) -> Outcome {
        match self.slots.get_mut(index) {
            Some(NativeArg::OutBool(slot)) => {
                **slot = u16::from(value);
                Ok(())
            }
            _ => Err(self.mismatch(index, "a bool output")),
        }
    }

    pub(crate) fn put_double(&mut self, index: usize, value: f64) -> Outcome {
        match self.slots.get_mut(index) {
            Some(NativeArg::OutDouble(slot)) => {
                **slot = value;
                Ok(())
            }
            _ => Err(self.mismatch(index, "a double output")),
        }
    }

    /// Report a staged length through the trailing `len` slot.
    pub(crate) fn put_len(&mut self, len: usize) -> Outcome {
        let last = self.slots.len().saturating_sub(1);
        self.put_integer(last, len as i32)
    }

    // ========================================================================
    // Buffers
    // ========================================================================

    pub(crate) fn wide_buf(&mut self, index: usize) -> Outcome<&mut [u16]> {
        let mismatch = self.mismatch(index, "a wide buffer");
        match self.slots.get_mut(index) {
            Some(NativeArg::WideBuf(buf)) => Ok(&mut **buf),
            _ => Err(mismatch),
        }
    }

    pub(crate) fn cardinal_buf(&mut self, index: usize) -> Outcome<&mut [u32]> {
        let mismatch = self.mismatch(index, "a cardinal buffer");
        match self.slots.get_mut(index) {
            Some(NativeArg::CardinalBuf(buf)) => Ok(&mut **buf),
            _ => Err(mismatch),
        }
    }

    pub(crate) fn byte_buf(&mut self, index: usize) -> Outcome<&mut [u8]> {
        let mismatch = self.mismatch(index, "a byte buffer");
        match self.slots.get_mut(index) {
            Some(NativeArg::ByteBuf(buf)) => Ok(&mut **buf),
            _ => Err(mismatch),
        }
    }
}
