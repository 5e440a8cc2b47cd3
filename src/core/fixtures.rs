// fixtures.rs - Shared alignments for unit tests

use super::alignment::AlignmentMatrix;

pub const PROTEIN_ROWS: [(&str, &str); 6] = [
    ("Sequence0", "--------FAYTAPD---LLLIGFLLKTVA-T-FG--DTWF-----QLWQGLDLNKMPVF"),
    ("Sequence1", "----------DPAVL----FV--IMLGTIT-K-FS--SEWF-----FAWLGLEINMMVII"),
    ("Sequence2", "----------GLGKV---IVY-GIVLGTKS-DQFSNWVVWL-----FPWNGLQIHMMGII"),
    ("Sequence3", "-----------PTIL---NIA-GLHMETDI-N-FS--LAWF-----QAWGGLEINKQAIL"),
    ("Sequence4", "----------ASGAI---LTL-GIYLFTLC-AVIS--VSWY-----LAWLGLEINMMAII"),
    ("Sequence5", "AAAAAAAA----ALL---TYL-GLFLGTDY-----EN---FAAAAANAWLGLEINMMAQI"),
];

/// Gap count of every column of [`PROTEIN_ROWS`]
pub const PROTEIN_GAPS: [usize; 60] = [
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 2, 1, 0, 0, 0, 6, 6, 6, 1, 0, 0, 5, 1, 0, 0, 0, 0, 0, 0, 0, 6,
    1, 4, 1, 1, 4, 4, 1, 1, 1, 0, 5, 5, 5, 5, 5, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

pub fn protein_fixture() -> AlignmentMatrix {
    match AlignmentMatrix::from_pairs(&PROTEIN_ROWS) {
        Ok(matrix) => matrix,
        Err(e) => panic!("fixture must load: {}", e),
    }
}

/// Three alignments of the same four sequences with different gap placement
pub fn consistency_fixture() -> Vec<AlignmentMatrix> {
    let sets: [[(&str, &str); 4]; 3] = [
        [
            ("s1", "MKV-LAAG"),
            ("s2", "MKVILA-G"),
            ("s3", "M-VILAAG"),
            ("s4", "MKVIL-AG"),
        ],
        [
            ("s2", "MKVILA-G-"),
            ("s1", "MKVL-AAG-"),
            ("s3", "M-VILAAG-"),
            ("s4", "MKVILA--G"),
        ],
        [
            ("s1", "MKVLAAG---"),
            ("s2", "MKVILAG---"),
            ("s3", "---MVILAAG"),
            ("s4", "MKVILAG---"),
        ],
    ];
    sets.iter()
        .map(|rows| match AlignmentMatrix::from_pairs(rows) {
            Ok(matrix) => matrix,
            Err(e) => panic!("fixture must load: {}", e),
        })
        .collect()
}
