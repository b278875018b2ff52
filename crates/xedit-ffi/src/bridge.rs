//! The call bridge: validated, error-translating access to the native call table.
//!
//! Every native function goes through [`Bridge::invoke`], which checks the
//! arguments against the catalog, performs the call and, on a `false`
//! success flag, reads the engine's last-error side channel before anything
//! else can overwrite it.
//!
//! Variable-length results use the two-call idiom: the operation stages its
//! result inside the engine and reports the length, then a `GetResult*`
//! call copies it out. [`Bridge::fetch_dynamic`] performs both halves under
//! one `&mut self` borrow, so no other call can land in between.

use tracing::debug;
use xedit_core::{Handle, NativeCallFailure, XEditError, XEditResult};

use crate::arg::{NativeArg, NativeReturn, OutValue};
use crate::catalog::{FunctionSignature, NativeFn, ParamRule};
use crate::strings::from_wide;

/// The seam between the bridge and whatever implements the call table.
///
/// Implemented by the dynamic library loader and by the in-memory mock.
/// Implementations perform the raw call only; validation and error
/// translation belong to the bridge.
pub trait NativeApi {
    fn call(&mut self, func: NativeFn, args: &mut [NativeArg<'_>]) -> XEditResult<NativeReturn>;
}

impl<T: NativeApi + ?Sized> NativeApi for Box<T> {
    fn call(&mut self, func: NativeFn, args: &mut [NativeArg<'_>]) -> XEditResult<NativeReturn> {
        (**self).call(func, args)
    }
}

/// Results that can be copied out of the engine's staging buffer.
pub trait DynamicResult: Sized {
    /// The `GetResult*` function that fills this kind of result.
    const FILL: NativeFn;

    /// Copy `len` staged units out of the engine.
    fn fill(bridge: &mut Bridge, len: usize) -> XEditResult<Self>;
}

impl DynamicResult for String {
    const FILL: NativeFn = NativeFn::GetResultString;

    fn fill(bridge: &mut Bridge, len: usize) -> XEditResult<Self> {
        // One spare unit for the terminator the engine appends.
        let mut buf = vec![0u16; len + 1];
        bridge.invoke(
            Self::FILL,
            &mut [NativeArg::WideBuf(&mut buf), NativeArg::Integer(len as i32)],
        )?;
        from_wide(&buf[..len])
    }
}

impl DynamicResult for Vec<Handle> {
    const FILL: NativeFn = NativeFn::GetResultArray;

    fn fill(bridge: &mut Bridge, len: usize) -> XEditResult<Self> {
        let mut buf = vec![0u32; len];
        bridge.invoke(
            Self::FILL,
            &mut [NativeArg::CardinalBuf(&mut buf), NativeArg::Integer(len as i32)],
        )?;
        Ok(buf.into_iter().map(Handle).collect())
    }
}

impl DynamicResult for Vec<u8> {
    const FILL: NativeFn = NativeFn::GetResultBytes;

    fn fill(bridge: &mut Bridge, len: usize) -> XEditResult<Self> {
        let mut buf = vec![0u8; len];
        bridge.invoke(
            Self::FILL,
            &mut [NativeArg::ByteBuf(&mut buf), NativeArg::Integer(len as i32)],
        )?;
        Ok(buf)
    }
}

pub struct Bridge {
    api: Box<dyn NativeApi>,
}

impl Bridge {
    pub fn new(api: impl NativeApi + 'static) -> Self {
        Self { api: Box::new(api) }
    }

    pub fn from_boxed(api: Box<dyn NativeApi>) -> Self {
        Self { api }
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Invoke `func`, translating a `false` success flag into
    /// [`XEditError::NativeCall`].
    pub fn invoke(&mut self, func: NativeFn, args: &mut [NativeArg<'_>]) -> XEditResult<NativeReturn> {
        match self.invoke_raw(func, args)? {
            NativeReturn::Bool(false) => Err(self.failure(func, args).into()),
            ret => Ok(ret),
        }
    }

    /// Invoke `func`, reporting a `false` success flag as `None`.
    ///
    /// Used by probe queries where absence is an expected answer. Argument
    /// and loader errors still propagate.
    pub fn invoke_optional(
        &mut self,
        func: NativeFn,
        args: &mut [NativeArg<'_>],
    ) -> XEditResult<Option<NativeReturn>> {
        match self.invoke_raw(func, args)? {
            NativeReturn::Bool(false) => {
                debug!(operation = func.name(), "optional native call returned false");
                Ok(None)
            }
            ret => Ok(Some(ret)),
        }
    }

    fn invoke_raw(&mut self, func: NativeFn, args: &mut [NativeArg<'_>]) -> XEditResult<NativeReturn> {
        validate(func, func.signature(), args)?;
        self.api.call(func, args)
    }

    fn failure(&mut self, func: NativeFn, args: &[NativeArg<'_>]) -> NativeCallFailure {
        let rendered = args.iter().filter_map(NativeArg::render).collect();
        let message = self.exception_message();
        let stack = self.exception_stack();
        NativeCallFailure {
            operation: func.name(),
            args: rendered,
            message,
            stack,
        }
    }

    // ========================================================================
    // Two-call idiom
    // ========================================================================

    /// Run a staging call and copy its result out in one step.
    ///
    /// `args` are the inputs of `func`; the trailing length slot is supplied
    /// here. A zero length skips the fill call.
    pub fn fetch_dynamic<T: DynamicResult + Default>(
        &mut self,
        func: NativeFn,
        args: Vec<NativeArg<'_>>,
    ) -> XEditResult<T> {
        let len = self.stage(func, args, false)?.unwrap_or(0);
        self.drain(len)
    }

    /// Like [`fetch_dynamic`](Self::fetch_dynamic), but a failed staging
    /// call yields `None`.
    pub fn fetch_dynamic_optional<T: DynamicResult + Default>(
        &mut self,
        func: NativeFn,
        args: Vec<NativeArg<'_>>,
    ) -> XEditResult<Option<T>> {
        match self.stage(func, args, true)? {
            Some(len) => self.drain(len).map(Some),
            None => Ok(None),
        }
    }

    fn stage(&mut self, func: NativeFn, args: Vec<NativeArg<'_>>, optional: bool) -> XEditResult<Option<usize>> {
        let sig = func.signature();
        if sig.result_len_index() != Some(args.len()) {
            return Err(XEditError::ArgumentMismatch {
                operation: func.name(),
                detail: "not a staging call, or length slot supplied by caller".to_string(),
            });
        }
        let mut len = 0i32;
        let mut args: Vec<NativeArg<'_>> = args;
        args.push(NativeArg::OutInteger(&mut len));
        let ok = if optional {
            self.invoke_optional(func, &mut args)?.is_some()
        } else {
            self.invoke(func, &mut args).map(|_| true)?
        };
        drop(args);
        Ok(ok.then(|| len.max(0) as usize))
    }

    fn drain<T: DynamicResult + Default>(&mut self, len: usize) -> XEditResult<T> {
        if len == 0 {
            return Ok(T::default());
        }
        T::fill(self, len)
    }

    // ========================================================================
    // Helpers for typed entries
    // ========================================================================

    /// Invoke a function whose only effect is its success flag.
    pub(crate) fn call(&mut self, func: NativeFn, mut args: Vec<NativeArg<'_>>) -> XEditResult<()> {
        self.invoke(func, &mut args).map(|_| ())
    }

    /// Invoke a function whose trailing parameter is a scalar output.
    pub(crate) fn call_out<T: OutValue>(&mut self, func: NativeFn, args: Vec<NativeArg<'_>>) -> XEditResult<T> {
        let mut out = T::default();
        let mut args: Vec<NativeArg<'_>> = args;
        args.push(T::slot(&mut out));
        self.invoke(func, &mut args)?;
        drop(args);
        Ok(out)
    }

    pub(crate) fn call_out_optional<T: OutValue>(
        &mut self,
        func: NativeFn,
        args: Vec<NativeArg<'_>>,
    ) -> XEditResult<Option<T>> {
        let mut out = T::default();
        let mut args: Vec<NativeArg<'_>> = args;
        args.push(T::slot(&mut out));
        let ok = self.invoke_optional(func, &mut args)?.is_some();
        drop(args);
        Ok(ok.then_some(out))
    }

    pub(crate) fn call_handle(&mut self, func: NativeFn, args: Vec<NativeArg<'_>>) -> XEditResult<Handle> {
        self.call_out::<u32>(func, args).map(Handle)
    }

    pub(crate) fn call_handle_optional(
        &mut self,
        func: NativeFn,
        args: Vec<NativeArg<'_>>,
    ) -> XEditResult<Option<Handle>> {
        Ok(self.call_out_optional::<u32>(func, args)?.map(Handle))
    }

    pub(crate) fn call_bool(&mut self, func: NativeFn, args: Vec<NativeArg<'_>>) -> XEditResult<bool> {
        self.call_out::<u16>(func, args).map(|v| v != 0)
    }

    // ========================================================================
    // Side channel
    // ========================================================================

    /// Message of the last exception raised inside the engine.
    pub fn exception_message(&mut self) -> String {
        self.side_channel(NativeFn::GetExceptionMessageLength, NativeFn::GetExceptionMessage)
    }

    /// Stack trace of the last exception raised inside the engine.
    pub fn exception_stack(&mut self) -> String {
        self.side_channel(NativeFn::GetExceptionStackLength, NativeFn::GetExceptionStack)
    }

    /// Accumulated engine log messages.
    pub fn messages(&mut self) -> String {
        self.side_channel(NativeFn::GetMessagesLength, NativeFn::GetMessages)
    }

    pub fn clear_messages(&mut self) -> XEditResult<()> {
        self.invoke(NativeFn::ClearMessages, &mut []).map(|_| ())
    }

    /// Read one length/fill pair directly. Failures read as empty: this runs
    /// while reporting another failure and must not recurse.
    fn side_channel(&mut self, length: NativeFn, fill: NativeFn) -> String {
        let mut len = 0i32;
        let status = self.api.call(length, &mut [NativeArg::OutInteger(&mut len)]);
        if status.is_err() || len <= 0 {
            return String::new();
        }
        let len = len as usize;
        let mut buf = vec![0u16; len + 1];
        match self
            .api
            .call(fill, &mut [NativeArg::WideBuf(&mut buf), NativeArg::Integer(len as i32)])
        {
            Ok(NativeReturn::Bool(true)) => from_wide(&buf[..len]).unwrap_or_default(),
            _ => String::new(),
        }
    }
}

/// Check `args` against the catalog entry for `func`.
fn validate(func: NativeFn, sig: &FunctionSignature, args: &[NativeArg<'_>]) -> XEditResult<()> {
    if sig.params.len() != args.len() {
        return Err(XEditError::ArgumentMismatch {
            operation: func.name(),
            detail: format!("expected {} arguments, got {}", sig.params.len(), args.len()),
        });
    }
    for (param, arg) in sig.params.iter().zip(args) {
        if !param.rule.accepts(arg) {
            return Err(XEditError::ArgumentMismatch {
                operation: func.name(),
                detail: format!("parameter '{}' expects {:?}, got {:?}", param.name, param.rule, arg),
            });
        }
        // The engine reads strings up to their nul.
        if let NativeArg::Str(units) = arg
            && units.last() != Some(&0)
        {
            return Err(XEditError::ArgumentMismatch {
                operation: func.name(),
                detail: format!("parameter '{}' is not nul-terminated", param.name),
            });
        }
        // Buffers must be able to hold the advertised length.
        if let ParamRule::Buffer(_) = param.rule
            && let Some(NativeArg::Integer(max_len)) = args.last()
        {
            let capacity = match arg {
                NativeArg::WideBuf(b) => b.len(),
                NativeArg::CardinalBuf(b) => b.len(),
                NativeArg::ByteBuf(b) => b.len(),
                _ => 0,
            };
            if (*max_len).max(0) as usize > capacity {
                return Err(XEditError::ArgumentMismatch {
                    operation: func.name(),
                    detail: format!("buffer of {capacity} cannot hold {max_len}"),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockEngine, NodeSpec};
    use crate::strings::to_wide;

    fn engine_with_record() -> (MockEngine, Bridge, Handle) {
        let engine = MockEngine::new();
        let file = engine.add_plugin("Test.esp");
        let record = engine.add_record(file, "GLOB", 0x0000_0801, "GameHourScale");
        engine.add_child(record, NodeSpec::string("FULL", "Ünïcode näme"));
        engine.add_child(record, NodeSpec::string("DESC", ""));
        let handle = engine.handle_for(record);
        let bridge = Bridge::new(engine.clone());
        (engine, bridge, handle)
    }

    #[test]
    fn fill_copies_exactly_the_staged_length() {
        let (engine, mut bridge, record) = engine_with_record();
        let value = bridge.get_value(record, "FULL").unwrap();
        assert_eq!(value, "Ünïcode näme");
        let fills = engine.fills();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].staged, fills[0].copied);
        assert_eq!(fills[0].max_len, fills[0].staged);
    }

    #[test]
    fn empty_result_skips_the_fill() {
        let (engine, mut bridge, record) = engine_with_record();
        assert_eq!(bridge.get_value(record, "DESC").unwrap(), "");
        assert_eq!(engine.count_calls(NativeFn::GetResultString), 0);
    }

    #[test]
    fn failure_reads_the_side_channel() {
        let (_, mut bridge, record) = engine_with_record();
        let err = bridge.get_element(record, "MODL").unwrap_err();
        let failure = err.native().unwrap();
        assert_eq!(failure.operation, "GetElement");
        assert_eq!(failure.args, vec![record.to_string(), "\"MODL\"".to_string()]);
        assert_eq!(failure.message, "Failed to resolve element at path: MODL");
        assert!(failure.stack.contains("GetElement"));
    }

    #[test]
    fn side_channel_is_cleared_by_the_next_call() {
        let (_, mut bridge, record) = engine_with_record();
        assert!(bridge.get_element(record, "MODL").is_err());
        assert!(bridge.get_element(record, "FULL").is_ok());
        assert_eq!(bridge.exception_message(), "");
    }

    #[test]
    fn optional_probe_is_none_not_error() {
        let (_, mut bridge, record) = engine_with_record();
        assert_eq!(bridge.try_get_element(record, "MODL").unwrap(), None);
        assert!(bridge.try_signature(record).unwrap().is_some());
    }

    #[test]
    fn mismatched_arguments_never_reach_the_engine() {
        let (engine, mut bridge, record) = engine_with_record();
        engine.clear_calls();
        let path = to_wide("FULL");
        let err = bridge
            .invoke(NativeFn::GetElement, &mut [NativeArg::Handle(record), NativeArg::Str(&path)])
            .unwrap_err();
        assert!(matches!(err, XEditError::ArgumentMismatch { operation: "GetElement", .. }));
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn short_buffers_are_rejected() {
        let mut bridge = Bridge::new(MockEngine::new());
        let mut buf = vec![0u16; 2];
        let err = bridge
            .invoke(
                NativeFn::GetResultString,
                &mut [NativeArg::WideBuf(&mut buf), NativeArg::Integer(8)],
            )
            .unwrap_err();
        assert!(matches!(err, XEditError::ArgumentMismatch { .. }));
    }

    #[test]
    fn unterminated_strings_are_rejected() {
        let (engine, mut bridge, record) = engine_with_record();
        engine.clear_calls();
        let path: Vec<u16> = "FULL".encode_utf16().collect();
        let empty: [u16; 0] = [];
        for units in [&path[..], &empty[..]] {
            let mut found = 0u16;
            let err = bridge
                .invoke(
                    NativeFn::HasElement,
                    &mut [NativeArg::Handle(record), NativeArg::Str(units), NativeArg::OutBool(&mut found)],
                )
                .unwrap_err();
            assert!(matches!(err, XEditError::ArgumentMismatch { .. }));
        }
        assert!(engine.calls().is_empty());

        let path = to_wide("FULL");
        let mut found = 0u16;
        bridge
            .invoke(
                NativeFn::HasElement,
                &mut [NativeArg::Handle(record), NativeArg::Str(&path), NativeArg::OutBool(&mut found)],
            )
            .unwrap();
        assert_ne!(found, 0);
    }

    #[test]
    fn staging_requires_the_length_slot_to_be_ours() {
        let mut bridge = Bridge::new(MockEngine::new());
        let mut len = 0i32;
        let err = bridge
            .fetch_dynamic::<String>(NativeFn::GetGlobals, vec![NativeArg::OutInteger(&mut len)])
            .unwrap_err();
        assert!(matches!(err, XEditError::ArgumentMismatch { .. }));
    }

    #[test]
    fn injected_failures_surface_as_native_errors() {
        let (engine, mut bridge, record) = engine_with_record();
        engine.fail_next(NativeFn::Name, "Access violation");
        let err = bridge.name(record).unwrap_err();
        assert_eq!(err.native().unwrap().message, "Access violation");
        assert_eq!(bridge.name(record).unwrap(), "GameHourScale");
    }

    #[test]
    fn messages_round_trip() {
        let engine = MockEngine::new();
        engine.push_message("Loading Skyrim.esm");
        let mut bridge = Bridge::new(engine);
        assert_eq!(bridge.messages(), "Loading Skyrim.esm");
        bridge.clear_messages().unwrap();
        assert_eq!(bridge.messages(), "");
    }
}
