//! Part planning for multipart uploads
//!
//! Splits a file of known size into fixed-size parts with 1-based part
//! numbers and inclusive byte ranges, matching both the S3 multipart API
//! and HTTP `Range` header semantics. The final part carries the
//! remainder and may be shorter.

use crate::domain::errors::DomainError;

/// One planned part of a multipart upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    /// 1-based part number
    pub part_number: i32,
    /// First byte of the part (inclusive)
    pub from: u64,
    /// Last byte of the part (inclusive)
    pub to: u64,
}

impl PartRange {
    /// Length of the part in bytes
    pub fn byte_len(&self) -> u64 {
        self.to - self.from + 1
    }
}

/// Iterator over the parts of a file of `size` bytes in `part_size` chunks
#[derive(Debug, Clone)]
pub struct PartPlan {
    size: u64,
    part_size: u64,
    offset: u64,
    next_part: i32,
}

impl PartPlan {
    /// Plans a multipart upload
    ///
    /// # Arguments
    /// * `size` - Total file size in bytes, must be non-zero
    /// * `part_size` - Size of each part, must be non-zero
    /// * `max_parts` - Upper bound on the part count (S3 caps at 10000)
    pub fn new(size: u64, part_size: u64, max_parts: u32) -> Result<Self, DomainError> {
        if size == 0 {
            return Err(DomainError::InvalidPartPlan(
                "cannot plan a multipart upload for an empty file".to_string(),
            ));
        }
        if part_size == 0 {
            return Err(DomainError::InvalidPartPlan(
                "part size must be non-zero".to_string(),
            ));
        }
        let count = size.div_ceil(part_size);
        if count > u64::from(max_parts) {
            return Err(DomainError::InvalidPartPlan(format!(
                "{size} bytes needs {count} parts of {part_size} bytes, exceeding the limit of {max_parts}"
            )));
        }
        Ok(Self {
            size,
            part_size,
            offset: 0,
            next_part: 1,
        })
    }

    /// Number of parts this plan will yield
    pub fn part_count(&self) -> u32 {
        self.size.div_ceil(self.part_size) as u32
    }
}

impl Iterator for PartPlan {
    type Item = PartRange;

    fn next(&mut self) -> Option<PartRange> {
        if self.offset >= self.size {
            return None;
        }
        let from = self.offset;
        let to = (self.offset + self.part_size).min(self.size) - 1;
        let part_number = self.next_part;

        self.offset = to + 1;
        self.next_part += 1;

        Some(PartRange {
            part_number,
            from,
            to,
        })
    }
}
