use std::{fmt::Display, num::NonZeroU32};

use thiserror::Error;

/// Message identifier that stays stable for the lifetime of a mailbox.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[repr(transparent)]
pub struct Uid(NonZeroU32);

/// Position of a message in the selected mailbox. Invalidated by every expunge, so it is never
/// stored beyond the batch it was resolved for.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[repr(transparent)]
pub struct SeqNum(NonZeroU32);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("message numbers start at 1")]
pub struct ZeroNumberError;

macro_rules! message_number {
    ($name:ident) => {
        impl TryFrom<u32> for $name {
            type Error = ZeroNumberError;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                NonZeroU32::new(value).map(Self).ok_or(ZeroNumberError)
            }
        }

        impl TryFrom<&u32> for $name {
            type Error = ZeroNumberError;

            fn try_from(value: &u32) -> Result<Self, Self::Error> {
                Self::try_from(*value)
            }
        }

        impl From<$name> for NonZeroU32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.0.get()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

message_number!(Uid);
message_number!(SeqNum);
