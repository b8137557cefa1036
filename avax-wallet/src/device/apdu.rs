//! APDU framing.

use async_trait::async_trait;

use crate::error::DeviceError;

/// Success
pub const SW_OK: u16 = 0x9000;
/// Conditions of use not satisfied: the user declined on the device
pub const SW_USER_REJECTED: u16 = 0x6985;
/// Command not allowed: some app versions report a declined request this way
pub const SW_NOT_ALLOWED: u16 = 0x6986;

const MAX_DATA_LEN: usize = 255;

/// A command sent to the device app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl ApduCommand {
    /// `CLA INS P1 P2 Lc data`
    pub fn serialize(&self) -> Result<Vec<u8>, DeviceError> {
        if self.data.len() > MAX_DATA_LEN {
            return Err(DeviceError::PayloadTooLarge(self.data.len()));
        }
        let mut bytes = Vec::with_capacity(5 + self.data.len());
        bytes.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2, self.data.len() as u8]);
        bytes.extend_from_slice(&self.data);
        Ok(bytes)
    }
}

/// A device response: payload followed by a two byte status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduAnswer {
    data: Vec<u8>,
    status: u16,
}

impl ApduAnswer {
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self, DeviceError> {
        if bytes.len() < 2 {
            return Err(DeviceError::MalformedResponse(format!(
                "answer of {} bytes has no status word",
                bytes.len()
            )));
        }
        let status_bytes = bytes.split_off(bytes.len() - 2);
        Ok(Self {
            data: bytes,
            status: u16::from_be_bytes([status_bytes[0], status_bytes[1]]),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// The payload if the status word is [`SW_OK`]
    pub fn into_data(self) -> Result<Vec<u8>, DeviceError> {
        match self.status {
            SW_OK => Ok(self.data),
            SW_USER_REJECTED | SW_NOT_ALLOWED => Err(DeviceError::UserRejected),
            other => Err(DeviceError::Status(other)),
        }
    }
}

/// Moves APDUs to and from a device.
#[async_trait]
pub trait ApduTransport: Send {
    async fn exchange(&mut self, command: &ApduCommand) -> Result<ApduAnswer, DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize() {
        let command = ApduCommand {
            cla: 0x80,
            ins: 0x02,
            p1: 0,
            p2: 0,
            data: vec![0xaa, 0xbb],
        };
        assert_eq!(
            command.serialize().unwrap(),
            vec![0x80, 0x02, 0, 0, 2, 0xaa, 0xbb]
        );

        let oversized = ApduCommand {
            data: vec![0; 256],
            ..command
        };
        assert!(matches!(
            oversized.serialize(),
            Err(DeviceError::PayloadTooLarge(256))
        ));
    }

    #[test]
    fn test_status_words() {
        let ok = ApduAnswer::from_bytes(vec![1, 2, 0x90, 0x00]).unwrap();
        assert_eq!(ok.data(), &[1, 2]);
        assert_eq!(ok.into_data().unwrap(), vec![1, 2]);

        let rejected = ApduAnswer::from_bytes(vec![0x69, 0x85]).unwrap();
        assert!(matches!(rejected.into_data(), Err(DeviceError::UserRejected)));

        let other = ApduAnswer::from_bytes(vec![0x6d, 0x00]).unwrap();
        assert_eq!(other.status(), 0x6d00);
        assert!(matches!(other.into_data(), Err(DeviceError::Status(0x6d00))));

        assert!(ApduAnswer::from_bytes(vec![0x90]).is_err());
    }
}
