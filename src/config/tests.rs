// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

use super::*;

macro_rules! params_test {
    ($n:ident, $toml:literal, $e:expr) => {
        #[test]
        fn $n() {
            let params: Parameters = toml::from_str($toml).expect("Could not parse parameters");
            assert_eq!(params, $e);
        }
    };
}

params_test!(empty, "", PARAMETERS);
params_test!(
    int_flags,
    "describe = 1\nfetch_details = 0",
    Parameters {
        describe: true,
        fetch_details: false,
        ..PARAMETERS
    }
);
params_test!(
    bool_flags,
    "describe = true",
    Parameters {
        describe: true,
        ..PARAMETERS
    }
);
params_test!(
    cf_limit,
    "cf_limit = 16",
    Parameters {
        cf_limit: 16,
        ..PARAMETERS
    }
);

#[test]
fn invalid_flag() {
    assert!(toml::from_str::<Parameters>("describe = 2").is_err());
}
