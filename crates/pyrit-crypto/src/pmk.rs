use sha1::Sha1;

/// PBKDF2-HMAC-SHA1 with 4096 iterations, the WPA/WPA2-PSK Pairwise Master
/// Key derivation (GLOSSARY: "PMK"). `essid` is the salt, `password` the
/// input key material; the output is always exactly 32 bytes.
///
/// This is the "compute PMKs" primitive the scheduler's core workers wrap;
/// the wider system treats device-specific implementations of it (VIA
/// Padlock, SSE2, CUDA, OpenCL...) as opaque and interchangeable. This one
/// backs the CPU core.
pub fn compute_pmk(essid: &[u8], password: &[u8]) -> [u8; 32] {
    let mut pmk = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha1>(password, essid, 4096, &mut pmk);
    pmk
}

/// The fixed test vector every core must reproduce at startup (§8.1):
/// `essid="foo"`, `pw="barbarbar"`.
pub const TEST_VECTOR_ESSID: &[u8] = b"foo";
pub const TEST_VECTOR_PASSWORD: &[u8] = b"barbarbar";
pub const TEST_VECTOR_PMK: [u8; 32] = [
    6, 56, 101, 54, 204, 94, 253, 3, 243, 250, 132, 170, 142, 162, 204, 132, 8, 151, 61, 243, 75,
    216, 75, 83, 128, 110, 237, 48, 35, 205, 166, 126,
];

/// A second, smaller reference table (ESSIDs `"foo"` and `"bar"`, ten
/// password:PMK pairs each) used by `selftest` to exercise more than the
/// single fixed vector above. Values ported from `PMK_TESTVECTORS` in
/// `examples/original_source/trunk/pyrit/cpyrit_util.py`.
pub fn test_vector_table() -> Vec<(&'static str, &'static str, [u8; 32])> {
    vec![
        (
            "foo",
            "soZcEvntHVrGRDIxNaBCyUL",
            [
                247, 210, 173, 42, 68, 187, 144, 253, 145, 93, 126, 250, 16, 188, 100, 55, 89,
                153, 135, 155, 198, 86, 124, 33, 45, 16, 9, 54, 113, 194, 159, 211,
            ],
        ),
        (
            "foo",
            "EVuYtpQCAZzBXyWNRGTI",
            [
                5, 48, 168, 39, 10, 98, 151, 201, 8, 80, 23, 138, 19, 24, 24, 50, 66, 214, 189,
                180, 159, 97, 194, 27, 212, 124, 114, 100, 253, 62, 50, 170,
            ],
        ),
        (
            "foo",
            "XNuwoiGMnjlkxBHfhyRgZrJItFDqQVESm",
            [
                248, 208, 207, 115, 247, 35, 170, 203, 214, 228, 228, 21, 40, 214, 165, 0, 98,
                194, 136, 62, 110, 253, 69, 205, 67, 215, 119, 109, 72, 226, 255, 199,
            ],
        ),
        (
            "foo",
            "bdzPWNTaIol",
            [
                228, 236, 73, 0, 189, 244, 21, 141, 84, 247, 3, 144, 2, 164, 99, 205, 37, 72, 218,
                202, 182, 246, 227, 84, 24, 58, 147, 114, 206, 221, 40, 127,
            ],
        ),
        (
            "foo",
            "nwUaVYhRbvsH",
            [
                137, 21, 14, 210, 213, 68, 210, 123, 35, 143, 108, 57, 196, 47, 62, 161, 150, 35,
                165, 197, 154, 61, 76, 14, 212, 88, 125, 234, 51, 38, 159, 208,
            ],
        ),
        (
            "foo",
            "gfeuvPBbaDrQHldZzRtXykjFWwAhS",
            [
                88, 127, 99, 35, 137, 177, 147, 161, 244, 32, 197, 233, 178, 1, 96, 247, 5, 109,
                163, 250, 35, 222, 188, 143, 155, 70, 106, 1, 253, 79, 109, 135,
            ],
        ),
        (
            "foo",
            "QcbpRkAJerVqHz",
            [
                158, 124, 37, 190, 197, 150, 225, 165, 3, 34, 104, 147, 107, 253, 233, 127, 33,
                239, 75, 11, 169, 187, 127, 171, 187, 165, 166, 187, 95, 107, 137, 212,
            ],
        ),
        (
            "foo",
            "EbYJsCNiwXDmHtgkFVacuOv",
            [
                136, 5, 34, 189, 145, 60, 145, 54, 179, 198, 195, 223, 34, 180, 144, 3, 116, 102,
                39, 134, 68, 82, 210, 185, 190, 199, 36, 25, 136, 152, 0, 111,
            ],
        ),
        (
            "foo",
            "GpIMrFZwLcqyt",
            [
                28, 144, 175, 10, 200, 46, 253, 227, 219, 35, 98, 208, 220, 11, 101, 95, 62, 244,
                80, 221, 111, 49, 206, 255, 174, 100, 240, 240, 33, 229, 172, 207,
            ],
        ),
        (
            "foo",
            "tKxgswlaOMLeZVScGDW",
            [
                237, 62, 117, 60, 38, 107, 65, 166, 113, 174, 196, 221, 128, 227, 69, 89, 23, 77,
                119, 234, 41, 176, 145, 105, 92, 40, 157, 151, 229, 50, 81, 65,
            ],
        ),
        (
            "bar",
            "zLwSfveNskZoR",
            [
                38, 93, 196, 77, 112, 65, 163, 197, 249, 158, 180, 107, 231, 140, 188, 60, 254,
                77, 12, 210, 77, 185, 233, 59, 79, 212, 222, 181, 44, 19, 127, 220,
            ],
        ),
        (
            "bar",
            "lxsvOCeZXop",
            [
                91, 39, 98, 36, 82, 2, 162, 106, 12, 244, 4, 113, 155, 120, 131, 133, 11, 209, 12,
                12, 240, 213, 203, 156, 129, 148, 28, 64, 31, 61, 162, 13,
            ],
        ),
        (
            "bar",
            "tfHrgLLOA",
            [
                110, 72, 123, 80, 222, 233, 150, 54, 40, 99, 205, 155, 177, 157, 174, 172, 87, 11,
                247, 164, 87, 85, 136, 165, 21, 107, 93, 212, 71, 133, 145, 211,
            ],
        ),
        (
            "bar",
            "vBgsaSJrlqajUlQJM",
            [
                113, 110, 180, 150, 204, 221, 61, 202, 238, 142, 147, 118, 177, 196, 65, 79, 102,
                47, 179, 80, 175, 95, 251, 35, 227, 220, 47, 121, 50, 125, 55, 16,
            ],
        ),
        (
            "bar",
            "daDIHwIMKSUaKWXS",
            [
                33, 87, 211, 99, 26, 70, 123, 19, 254, 229, 148, 97, 252, 182, 3, 44, 228, 125,
                85, 141, 247, 223, 166, 133, 246, 37, 204, 145, 100, 218, 66, 70,
            ],
        ),
        (
            "bar",
            "agHOeAjOpK",
            [
                226, 163, 62, 215, 250, 63, 6, 32, 130, 34, 117, 116, 189, 178, 245, 172, 74, 26,
                138, 10, 106, 119, 15, 214, 210, 114, 51, 94, 254, 57, 81, 200,
            ],
        ),
        (
            "bar",
            "vRfEagJIzSohxsakj",
            [
                61, 71, 159, 35, 233, 27, 138, 30, 228, 121, 38, 201, 57, 83, 192, 211, 248, 207,
                149, 12, 147, 70, 190, 216, 52, 14, 165, 190, 226, 180, 62, 210,
            ],
        ),
        (
            "bar",
            "PuDomzkiwsejblaXs",
            [
                227, 164, 137, 231, 16, 31, 222, 169, 134, 1, 238, 190, 55, 126, 255, 88, 178,
                118, 148, 119, 244, 130, 183, 219, 124, 249, 194, 96, 94, 159, 163, 185,
            ],
        ),
        (
            "bar",
            "RErvpNrOsW",
            [
                24, 145, 197, 137, 14, 154, 1, 36, 73, 148, 9, 192, 138, 157, 164, 81, 47, 184,
                41, 75, 225, 34, 71, 153, 59, 253, 127, 179, 242, 193, 246, 177,
            ],
        ),
        (
            "bar",
            "ipptbpKkCCep",
            [
                81, 34, 253, 39, 124, 19, 234, 163, 32, 10, 104, 88, 249, 29, 40, 142, 24, 173, 1,
                68, 187, 212, 21, 189, 74, 88, 83, 228, 7, 100, 23, 244,
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_fixed_test_vector() {
        assert_eq!(
            compute_pmk(TEST_VECTOR_ESSID, TEST_VECTOR_PASSWORD),
            TEST_VECTOR_PMK
        );
    }

    #[test]
    fn matches_reference_table() {
        for (essid, pw, pmk) in test_vector_table() {
            assert_eq!(compute_pmk(essid.as_bytes(), pw.as_bytes()), pmk);
        }
    }
}
