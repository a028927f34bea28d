use crate::{common::types::Gender, error::ConvertError};
use log::info;
use ndarray as nd;
use ndarray::prelude::*;
use ndarray_npy::{NpzReader, WriteNpyExt};
use std::{
    collections::BTreeMap,
    ffi::OsStr,
    fs::{self, File},
    io::{Read, Seek, Write},
    path::{Path, PathBuf},
};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

/// All converted motions are resampled upstream to this rate.
pub const MOCAP_FRAMERATE: i64 = 30;

/// Entry names written by the codec itself; everything else in an archive is
/// a passthrough field.
const CORE_ENTRIES: [&str; 5] = ["poses", "trans", "betas", "mocap_framerate", "gender"];

/// The contents of an AMASS-style `.npz` archive.
#[derive(Debug, Clone)]
pub struct AmassCodec {
    pub poses: Array2<f32>, // num_frames x 66
    pub trans: Array2<f32>, // num_frames x 3
    pub betas: Array1<f32>,
    pub mocap_framerate: i64,
    pub gender: Gender,
    pub extras: BTreeMap<String, ArrayD<f32>>,
}

impl AmassCodec {
    /// Writes the archive to `path`, appending `.npz` when missing. The
    /// archive is assembled in a temporary sibling file and renamed into
    /// place, so a failed write never leaves a partial `.npz` behind.
    pub fn to_file(&self, path: &Path) -> Result<PathBuf, ConvertError> {
        let path = ensure_npz_extension(path);
        let tmp = path.with_extension("npz.tmp");
        match self.write_archive(&tmp) {
            Ok(()) => {
                fs::rename(&tmp, &path)?;
                info!("saved amass archive to {}", path.display());
                Ok(path)
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(e)
            }
        }
    }

    fn write_archive(&self, path: &Path) -> Result<(), ConvertError> {
        let mut zip = ZipWriter::new(File::create(path)?);
        self.write_to_zip(&mut zip)?;
        zip.finish()?;
        Ok(())
    }

    /// Writes every entry as an uncompressed (stored) `.npy` member, the way
    /// `np.savez` lays out its archives.
    pub fn write_to_zip<W: Write + Seek>(&self, zip: &mut ZipWriter<W>) -> Result<(), ConvertError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        zip.start_file("poses.npy", options)?;
        self.poses.write_npy(&mut *zip)?;

        zip.start_file("trans.npy", options)?;
        self.trans.write_npy(&mut *zip)?;

        zip.start_file("betas.npy", options)?;
        self.betas.write_npy(&mut *zip)?;

        zip.start_file("mocap_framerate.npy", options)?;
        nd::Array0::<i64>::from_elem((), self.mocap_framerate).write_npy(&mut *zip)?;

        // ndarray-npy has no string element type, so the gender scalar is an
        // npy unicode scalar written by hand
        zip.start_file("gender.npy", options)?;
        zip.write_all(&str_scalar_npy(self.gender.as_str()))?;

        for (name, array) in &self.extras {
            zip.start_file(format!("{name}.npy"), options)?;
            array.write_npy(&mut *zip)?;
        }
        Ok(())
    }

    /// Loads an archive written by [`AmassCodec::to_file`].
    pub fn from_file(path: &Path) -> Result<Self, ConvertError> {
        let mut npz = NpzReader::new(File::open(path)?)?;
        let poses: Array2<f32> = npz.by_name("poses")?;
        let trans: Array2<f32> = npz.by_name("trans")?;
        let betas: Array1<f32> = npz.by_name("betas")?;
        let framerate: nd::Array0<i64> = npz.by_name("mocap_framerate")?;

        let mut extras = BTreeMap::new();
        for name in npz.names()? {
            let key = name.strip_suffix(".npy").unwrap_or(&name).to_string();
            if CORE_ENTRIES.contains(&key.as_str()) {
                continue;
            }
            let array: ArrayD<f32> = npz.by_name(&name)?;
            extras.insert(key, array);
        }
        drop(npz);

        let mut archive = ZipArchive::new(File::open(path)?)?;
        let mut entry = archive.by_name("gender.npy")?;
        let mut raw = Vec::new();
        entry.read_to_end(&mut raw)?;
        let label = read_str_scalar(&raw, "gender")?;
        let gender = Gender::from_label(&label).ok_or(ConvertError::Gender(label))?;

        Ok(Self {
            poses,
            trans,
            betas,
            mocap_framerate: framerate.into_scalar(),
            gender,
            extras,
        })
    }
}

fn ensure_npz_extension(path: &Path) -> PathBuf {
    match path.extension().and_then(OsStr::to_str) {
        Some("npz") => path.to_path_buf(),
        _ => {
            let mut with_suffix = path.as_os_str().to_owned();
            with_suffix.push(".npz");
            PathBuf::from(with_suffix)
        }
    }
}

/// Serializes a `str` as a zero-dimensional npy unicode array (`<U{n}`,
/// UCS-4 little-endian payload).
fn str_scalar_npy(value: &str) -> Vec<u8> {
    let chars: Vec<char> = value.chars().collect();
    let mut header = format!(
        "{{'descr': '<U{}', 'fortran_order': False, 'shape': (), }}",
        chars.len()
    )
    .into_bytes();
    // magic + version + header length field + header must align to 64 bytes,
    // newline terminated
    let unpadded = 10 + header.len() + 1;
    header.extend(std::iter::repeat(b' ').take((64 - unpadded % 64) % 64));
    header.push(b'\n');

    let mut out = Vec::with_capacity(10 + header.len() + chars.len() * 4);
    out.extend_from_slice(b"\x93NUMPY\x01\x00");
    out.extend_from_slice(&u16::try_from(header.len()).expect("npy header fits u16").to_le_bytes());
    out.extend_from_slice(&header);
    for c in chars {
        out.extend_from_slice(&(c as u32).to_le_bytes());
    }
    out
}

fn read_str_scalar(bytes: &[u8], entry: &'static str) -> Result<String, ConvertError> {
    if !bytes.starts_with(b"\x93NUMPY") || bytes.len() < 10 {
        return Err(ConvertError::BadStringScalar(entry));
    }
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let payload = bytes
        .get(10 + header_len..)
        .ok_or(ConvertError::BadStringScalar(entry))?;
    if payload.len() % 4 != 0 {
        return Err(ConvertError::BadStringScalar(entry));
    }
    let mut out = String::new();
    for chunk in payload.chunks_exact(4) {
        let code = u32::from_le_bytes(chunk.try_into().expect("chunks are 4 bytes"));
        if code == 0 {
            continue;
        }
        out.push(char::from_u32(code).ok_or(ConvertError::BadStringScalar(entry))?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_codec() -> AmassCodec {
        let mut extras = BTreeMap::new();
        extras.insert(
            "left_hand_pose".to_string(),
            ArrayD::from_elem(nd::IxDyn(&[2, 45]), 0.25_f32),
        );
        AmassCodec {
            poses: Array2::from_shape_fn((2, 66), |(i, j)| (i * 66 + j) as f32 * 0.01),
            trans: array![[0.0_f32, -0.92, 0.92], [0.0, -1.0, 0.92]],
            betas: Array1::from_vec(vec![0.1_f32, -0.2, 0.3]),
            mocap_framerate: MOCAP_FRAMERATE,
            gender: Gender::Neutral,
            extras,
        }
    }

    #[test]
    fn string_scalar_roundtrips() {
        let raw = str_scalar_npy("neutral");
        // header block (magic through newline) is 64-byte aligned
        assert_eq!((raw.len() - "neutral".len() * 4) % 64, 0);
        assert_eq!(read_str_scalar(&raw, "gender").unwrap(), "neutral");
    }

    #[test]
    fn garbage_is_not_a_string_scalar() {
        assert!(matches!(
            read_str_scalar(b"not an npy", "gender"),
            Err(ConvertError::BadStringScalar("gender"))
        ));
    }

    #[test]
    fn npz_extension_is_appended_once() {
        assert_eq!(ensure_npz_extension(Path::new("out")), PathBuf::from("out.npz"));
        assert_eq!(ensure_npz_extension(Path::new("out.npz")), PathBuf::from("out.npz"));
        assert_eq!(ensure_npz_extension(Path::new("out.pt")), PathBuf::from("out.pt.npz"));
    }

    #[test]
    fn archive_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let codec = sample_codec();
        let written = codec.to_file(&dir.path().join("motion")).unwrap();
        assert_eq!(written.file_name().unwrap(), "motion.npz");

        // no temporary file left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        let loaded = AmassCodec::from_file(&written).unwrap();
        assert_eq!(loaded.poses.dim(), (2, 66));
        assert_eq!(loaded.trans.dim(), (2, 3));
        assert_eq!(loaded.mocap_framerate, MOCAP_FRAMERATE);
        assert_eq!(loaded.gender, Gender::Neutral);
        for (a, b) in loaded.poses.iter().zip(codec.poses.iter()) {
            assert_relative_eq!(*a, *b);
        }
        for (a, b) in loaded.trans.iter().zip(codec.trans.iter()) {
            assert_relative_eq!(*a, *b);
        }
        for (a, b) in loaded.betas.iter().zip(codec.betas.iter()) {
            assert_relative_eq!(*a, *b);
        }
        let hands = &loaded.extras["left_hand_pose"];
        assert_eq!(hands.shape(), &[2, 45]);
        assert_relative_eq!(hands[[1, 44]], 0.25);
    }
}
