// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{SpecPath, TestStatus};
use proptest::prelude::*;

impl Arbitrary for TestStatus {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: ()) -> Self::Strategy {
        prop_oneof![
            Just(TestStatus::Idle),
            Just(TestStatus::Running),
            Just(TestStatus::Pass),
            Just(TestStatus::Fail),
        ]
        .boxed()
    }
}

impl Arbitrary for SpecPath {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: ()) -> Self::Strategy {
        ("[a-z]{1,8}", prop_oneof![Just("test"), Just("spec")], prop_oneof![Just("js"), Just("tsx")])
            .prop_map(|(stem, kind, ext)| SpecPath::new(format!("/src/{stem}.{kind}.{ext}")))
            .boxed()
    }
}
