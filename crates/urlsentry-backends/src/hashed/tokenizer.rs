use std::collections::BTreeMap;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Character n-gram tokenizer that hashes each gram into a fixed number of
/// buckets, so it needs no vocabulary file.
#[derive(Debug, Clone)]
pub struct HashingTokenizer {
    buckets: usize,
    gram: usize,
    max_length: usize,
}

/// Sparse bucket activations, sorted by bucket and L2 normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    pub features: Vec<(usize, f64)>,
    pub truncated: bool,
}

impl HashingTokenizer {
    pub fn new(buckets: usize, gram: usize, max_length: usize) -> anyhow::Result<Self> {
        if buckets == 0 || gram == 0 || max_length == 0 {
            anyhow::bail!(
                "invalid tokenizer shape: buckets={buckets} gram={gram} max_length={max_length}"
            );
        }
        Ok(Self {
            buckets,
            gram,
            max_length,
        })
    }

    pub fn buckets(&self) -> usize {
        self.buckets
    }

    pub fn encode(&self, text: &str) -> Encoding {
        let lowered: Vec<char> = text.to_lowercase().chars().collect();
        let truncated = lowered.len() > self.max_length;
        let chars = &lowered[..lowered.len().min(self.max_length)];

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        if chars.len() < self.gram {
            if !chars.is_empty() {
                *counts.entry(self.bucket(chars)).or_default() += 1.0;
            }
        } else {
            for window in chars.windows(self.gram) {
                *counts.entry(self.bucket(window)).or_default() += 1.0;
            }
        }

        let norm = counts.values().map(|v| v * v).sum::<f64>().sqrt();
        let features = counts
            .into_iter()
            .map(|(bucket, count)| (bucket, if norm > 0.0 { count / norm } else { count }))
            .collect();

        Encoding {
            features,
            truncated,
        }
    }

    fn bucket(&self, gram: &[char]) -> usize {
        let mut hash = FNV_OFFSET;
        let mut buf = [0u8; 4];
        for ch in gram {
            for byte in ch.encode_utf8(&mut buf).bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        }
        (hash % self.buckets as u64) as usize
    }
}
