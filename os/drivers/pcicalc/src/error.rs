use crate::module::ChrdevError;
use crate::uaccess::UserFault;
use core::fmt;
use kernel_pci::PciError;
use linux_raw_sys::errno::{EBUSY, EFAULT, EINVAL, ENODEV, ENOMEM};

/// Which side of the `+` a parser failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    A,
    B,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Why a request was rejected by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("missing operator")]
    MissingOperator,
    #[error("missing terminator")]
    MissingTerminator,
    #[error("malformed operand {0}")]
    MalformedOperand(Operand),
    #[error("operand {0} out of range")]
    OperandOutOfRange(Operand),
}

/// Why the device could not be bound or the module registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("a device is already bound")]
    AlreadyBound,
    #[error(transparent)]
    Platform(PciError),
    #[error(transparent)]
    Chrdev(ChrdevError),
}

impl RegistrationError {
    /// Whether the failure means "someone else owns it".
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::AlreadyBound
                | Self::Platform(PciError::RegionBusy { .. })
                | Self::Chrdev(ChrdevError::MajorInUse(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("out of memory")]
    AllocationFailure,
    #[error("fault copying user data")]
    FaultCopyingUserData,
    #[error("invalid request: {0}")]
    InvalidRequestSyntax(#[from] SyntaxError),
    #[error("device registration failed: {0}")]
    DeviceRegistrationFailure(#[from] RegistrationError),
}

impl DriverError {
    /// Negative errno handed back across the character-device boundary.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn errno(&self) -> i32 {
        let errno = match self {
            Self::AllocationFailure => ENOMEM,
            Self::FaultCopyingUserData => EFAULT,
            Self::InvalidRequestSyntax(_) => EINVAL,
            Self::DeviceRegistrationFailure(e) if e.is_busy() => EBUSY,
            Self::DeviceRegistrationFailure(_) => ENODEV,
        };
        -(errno as i32)
    }
}

impl From<UserFault> for DriverError {
    fn from(_: UserFault) -> Self {
        Self::FaultCopyingUserData
    }
}

impl From<PciError> for DriverError {
    fn from(e: PciError) -> Self {
        match e {
            PciError::DmaAllocFailed { .. } | PciError::MapFailed { .. } => Self::AllocationFailure,
            other => Self::DeviceRegistrationFailure(RegistrationError::Platform(other)),
        }
    }
}

impl From<ChrdevError> for DriverError {
    fn from(e: ChrdevError) -> Self {
        Self::DeviceRegistrationFailure(RegistrationError::Chrdev(e))
    }
}
