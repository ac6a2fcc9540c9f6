use std::str;

use rust_htslib::bam;

use crate::errors::*;
use crate::regions::GenomeLayout;

/// Generate the genome layout from the contigs in a BAM header.
pub fn build_layout_bam(header: &bam::HeaderView) -> Result<GenomeLayout> {
    let mut pairs: Vec<(String, usize)> = Vec::new();

    for (no, name) in header.target_names().iter().enumerate() {
        let name = str::from_utf8(name)
            .chain_err(|| "Could not decode contig name")?
            .to_string();
        let len = header
            .target_len(no as u32)
            .chain_err(|| format!("No length for contig {}", name))? as usize;
        pairs.push((name, len));
    }

    Ok(GenomeLayout::from_name_and_length(&pairs))
}

/// Parse @RG line into pair (id, sm).
fn parse_line_rg(line: &str) -> Option<(String, String)> {
    let mut id: Option<String> = None;
    let mut sm: Option<String> = None;
    for s in line.split('\t') {
        let token: Vec<&str> = s.splitn(2, ':').collect();
        if token.len() == 2 {
            match token[0] {
                "ID" => {
                    id = Some(token[1].to_string());
                }
                "SM" => {
                    sm = Some(token[1].to_string());
                }
                _ => (),
            }
        }
    }

    match (id, sm) {
        (Some(id), Some(sm)) => Some((id, sm)),
        _ => None,
    }
}

/// Construct list of distinct sample names from BAM header text.
pub fn samples_from_header(header: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(header);
    let mut samples: Vec<String> = Vec::new();

    for line in text.lines() {
        if line.starts_with("@RG") {
            if let Some((_id, sm)) = parse_line_rg(line) {
                if !samples.contains(&sm) {
                    samples.push(sm);
                }
            }
        }
    }

    samples
}

/// Extract the single sample name from the header of the file at `path`.
pub fn sample_from_header(path: &str, header: &[u8]) -> Result<String> {
    let mut samples = samples_from_header(header);
    if samples.len() != 1 {
        bail!(ErrorKind::MissingSampleTag(path.to_string(), samples.len()));
    }
    Ok(samples.remove(0))
}
