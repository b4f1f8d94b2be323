// LCP array with previous/next-smaller-value indexes.
//
// values[i] is the longest common prefix of the suffixes at BWT rows i-1 and
// i (values[0] = 0). psv[i] is the largest j < i with values[j] < values[i],
// with 0 standing in when there is none; nsv[i] is the smallest j > i with
// values[j] < values[i], with the array length standing in. Together they
// name the BWT interval of the parent suffix-tree node, which is what right
// retraction climbs to.
//
// On disk: array length followed by the three arrays back to back, all as
// platform-endian 64-bit words.

use crate::error::FmdError;
use crate::utils::BinaryWrite;
use memmap2::Mmap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LcpArray {
    values: Vec<u64>,
    psvs: Vec<u64>,
    nsvs: Vec<u64>,
}

impl LcpArray {
    /// Build the PSV/NSV indexes over raw LCP values with two stack sweeps.
    pub fn from_values(values: Vec<u64>) -> Self {
        let n = values.len();

        let mut psvs = vec![0u64; n];
        let mut stack: Vec<usize> = Vec::new();
        for i in 0..n {
            while let Some(&top) = stack.last() {
                if values[top] < values[i] {
                    break;
                }
                stack.pop();
            }
            psvs[i] = stack.last().copied().unwrap_or(0) as u64;
            stack.push(i);
        }

        let mut nsvs = vec![n as u64; n];
        stack.clear();
        for i in (0..n).rev() {
            while let Some(&top) = stack.last() {
                if values[top] < values[i] {
                    break;
                }
                stack.pop();
            }
            nsvs[i] = stack.last().copied().unwrap_or(n) as u64;
            stack.push(i);
        }

        LcpArray { values, psvs, nsvs }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn check(&self, index: usize, what: &'static str) -> Result<(), FmdError> {
        if index >= self.values.len() {
            return Err(FmdError::OutOfRange {
                what,
                index,
                len: self.values.len(),
            });
        }
        Ok(())
    }

    /// String depth shared by the suffixes at rows `index - 1` and `index`.
    pub fn value(&self, index: usize) -> Result<u64, FmdError> {
        self.check(index, "LCP")?;
        Ok(self.values[index])
    }

    /// Index of the previous strictly-smaller LCP value.
    pub fn psv(&self, index: usize) -> Result<u64, FmdError> {
        self.check(index, "LCP PSV")?;
        Ok(self.psvs[index])
    }

    /// Index of the next strictly-smaller LCP value; the array length when
    /// there is none.
    pub fn nsv(&self, index: usize) -> Result<u64, FmdError> {
        self.check(index, "LCP NSV")?;
        Ok(self.nsvs[index])
    }

    pub fn save(&self, path: &Path) -> Result<(), FmdError> {
        let mut file = BufWriter::new(File::create(path)?);
        file.write_u64_ne(self.values.len() as u64)?;
        for array in [&self.values, &self.psvs, &self.nsvs] {
            for &word in array.iter() {
                file.write_u64_ne(word)?;
            }
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, FmdError> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };

        let mut words = map.chunks_exact(8).map(|chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            u64::from_ne_bytes(word)
        });
        let n = words.next().ok_or_else(|| {
            FmdError::InconsistentIndex("LCP file shorter than its header".to_string())
        })? as usize;
        if map.len() != 8 * (1 + 3 * n) {
            return Err(FmdError::InconsistentIndex(format!(
                "LCP file holds {} bytes but its header promises {} entries",
                map.len(),
                n
            )));
        }
        let mut read_array = |what: &'static str| -> Result<Vec<u64>, FmdError> {
            let array: Vec<u64> = words.by_ref().take(n).collect();
            if array.len() != n {
                return Err(FmdError::InconsistentIndex(format!(
                    "LCP file truncated in the {what} array"
                )));
            }
            Ok(array)
        };
        let values = read_array("values")?;
        let psvs = read_array("PSV")?;
        let nsvs = read_array("NSV")?;
        Ok(LcpArray { values, psvs, nsvs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Brute-force definitions the stack sweeps must agree with.
    fn naive(values: &[u64]) -> (Vec<u64>, Vec<u64>) {
        let n = values.len();
        let mut psvs = vec![0u64; n];
        let mut nsvs = vec![n as u64; n];
        for i in 0..n {
            for j in (0..i).rev() {
                if values[j] < values[i] {
                    psvs[i] = j as u64;
                    break;
                }
            }
            for j in i + 1..n {
                if values[j] < values[i] {
                    nsvs[i] = j as u64;
                    break;
                }
            }
        }
        (psvs, nsvs)
    }

    #[test]
    fn stack_sweeps_match_naive_scan() {
        let cases: Vec<Vec<u64>> = vec![
            vec![0, 0, 1, 3, 2, 2, 0, 4, 1],
            vec![0, 1, 2, 3, 4],
            vec![0, 2, 2, 2, 1],
            vec![0],
            vec![],
        ];
        for values in cases {
            let lcp = LcpArray::from_values(values.clone());
            let (psvs, nsvs) = naive(&values);
            for i in 0..values.len() {
                assert_eq!(lcp.psv(i).unwrap(), psvs[i], "psv at {i} of {values:?}");
                assert_eq!(lcp.nsv(i).unwrap(), nsvs[i], "nsv at {i} of {values:?}");
            }
        }
    }

    #[test]
    fn out_of_range_is_reported() {
        let lcp = LcpArray::from_values(vec![0, 1]);
        assert!(lcp.value(1).is_ok());
        assert!(matches!(
            lcp.value(2),
            Err(FmdError::OutOfRange { len: 2, .. })
        ));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toy.lcp");
        let lcp = LcpArray::from_values(vec![0, 0, 2, 1, 3]);
        lcp.save(&path).unwrap();
        let restored = LcpArray::load(&path).unwrap();
        assert_eq!(restored.len(), 5);
        for i in 0..5 {
            assert_eq!(restored.value(i).unwrap(), lcp.value(i).unwrap());
            assert_eq!(restored.psv(i).unwrap(), lcp.psv(i).unwrap());
            assert_eq!(restored.nsv(i).unwrap(), lcp.nsv(i).unwrap());
        }
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.lcp");
        let lcp = LcpArray::from_values(vec![0, 0, 2, 1, 3]);
        lcp.save(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 8]).unwrap();
        assert!(matches!(
            LcpArray::load(&path),
            Err(FmdError::InconsistentIndex(_))
        ));
    }
}
