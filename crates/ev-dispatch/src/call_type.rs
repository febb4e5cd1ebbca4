//! The `*CALL*` flavours through which a precompile can be reached.

use revm::bytecode::opcode::{self, OpCode};
use std::fmt;
use thiserror::Error;

/// A `CallType` refers to one of the `*CALL*` [`OpCode`]s and the respective
/// call method on [`Evm`](crate::Evm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CallType {
    /// `CALL`: executes the target's code in the target's context.
    Call = opcode::CALL,
    /// `CALLCODE`: executes the target's code in the caller's context.
    CallCode = opcode::CALLCODE,
    /// `DELEGATECALL`: as `CALLCODE`, additionally inheriting the caller's caller and value.
    DelegateCall = opcode::DELEGATECALL,
    /// `STATICCALL`: as `CALL`, without value and with read-only state.
    StaticCall = opcode::STATICCALL,
}

impl CallType {
    /// All call types, in opcode order.
    pub const ALL: [Self; 4] = [Self::Call, Self::CallCode, Self::DelegateCall, Self::StaticCall];

    /// Returns whether `op` is the opcode of one of the call types.
    pub const fn is_valid(op: u8) -> bool {
        matches!(
            op,
            opcode::CALL | opcode::CALLCODE | opcode::DELEGATECALL | opcode::STATICCALL
        )
    }

    /// Returns whether the call type induces a read-only state if not already in one.
    pub const fn read_only(self) -> bool {
        matches!(self, Self::StaticCall)
    }

    /// Returns whether the call type carries a value parameter.
    pub const fn carries_value(self) -> bool {
        match self {
            Self::Call | Self::CallCode => true,
            Self::DelegateCall | Self::StaticCall => false,
        }
    }

    /// Returns the equivalent [`OpCode`].
    pub const fn opcode(self) -> OpCode {
        match self {
            Self::Call => OpCode::CALL,
            Self::CallCode => OpCode::CALLCODE,
            Self::DelegateCall => OpCode::DELEGATECALL,
            Self::StaticCall => OpCode::STATICCALL,
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.opcode(), f)
    }
}

impl TryFrom<u8> for CallType {
    type Error = InvalidCallType;

    fn try_from(op: u8) -> Result<Self, Self::Error> {
        match op {
            opcode::CALL => Ok(Self::Call),
            opcode::CALLCODE => Ok(Self::CallCode),
            opcode::DELEGATECALL => Ok(Self::DelegateCall),
            opcode::STATICCALL => Ok(Self::StaticCall),
            other => Err(InvalidCallType(other)),
        }
    }
}

impl From<CallType> for u8 {
    fn from(call_type: CallType) -> Self {
        call_type as Self
    }
}

/// A raw opcode that is not one of the [`CallType`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown CallType({0})")]
pub struct InvalidCallType(pub u8);

impl InvalidCallType {
    /// Always the `INVALID` sentinel.
    pub const fn opcode(self) -> OpCode {
        OpCode::INVALID
    }
}
