//! Built-in compile-and-run option schemas, one per canonical language.
//!
//! All fields are optional: an absent field means the judge's default.

use super::schema::{FieldRule, SchemaValidator};
use crate::types::CodeLanguage;

const OPTIMIZE_LEVELS: [&str; 5] = ["0", "1", "2", "3", "fast"];
const MACHINE_ARCH: [&str; 3] = ["64", "32", "x32"];

pub fn schema_for(language: CodeLanguage) -> SchemaValidator {
    match language {
        CodeLanguage::Cpp => SchemaValidator::new()
            .field("compiler", FieldRule::one_of(["g++", "clang++"]))
            .field("std", FieldRule::one_of(["03", "11", "14", "17", "20", "23"]))
            .field("O", FieldRule::one_of(OPTIMIZE_LEVELS))
            .field("m", FieldRule::one_of(MACHINE_ARCH)),
        CodeLanguage::C => SchemaValidator::new()
            .field("compiler", FieldRule::one_of(["gcc", "clang"]))
            .field("std", FieldRule::one_of(["89", "99", "11", "17", "23"]))
            .field("O", FieldRule::one_of(OPTIMIZE_LEVELS))
            .field("m", FieldRule::one_of(MACHINE_ARCH)),
        CodeLanguage::Cuda => SchemaValidator::new()
            .field("std", FieldRule::one_of(["11", "14", "17", "20"]))
            .field("O", FieldRule::one_of(["0", "1", "2", "3"]))
            .field(
                "arch",
                FieldRule::one_of(["sm_60", "sm_70", "sm_75", "sm_80", "sm_86", "sm_90"]),
            ),
        CodeLanguage::Java | CodeLanguage::FSharp => SchemaValidator::new(),
        CodeLanguage::Kotlin => SchemaValidator::new()
            .field("version", FieldRule::one_of(["1.8", "1.9", "2.0"]))
            .field("platform", FieldRule::one_of(["jvm"])),
        CodeLanguage::Pascal => {
            SchemaValidator::new().field("optimize", FieldRule::one_of(["-", "1", "2", "3", "4"]))
        }
        CodeLanguage::Python => SchemaValidator::new().field(
            "version",
            FieldRule::one_of(["2.7", "3.9", "3.10", "3.11", "3.12"]),
        ),
        CodeLanguage::Rust => SchemaValidator::new()
            .field("version", FieldRule::one_of(["2015", "2018", "2021", "2024"]))
            .field("optimize", FieldRule::one_of(["0", "1", "2", "3"])),
        CodeLanguage::Swift => SchemaValidator::new()
            .field("version", FieldRule::one_of(["4.2", "5", "6"]))
            .field("optimize", FieldRule::one_of(["Onone", "O", "Ounchecked"])),
        CodeLanguage::Go => SchemaValidator::new().field("version", FieldRule::one_of(["1.x"])),
        CodeLanguage::Haskell => {
            SchemaValidator::new().field("version", FieldRule::one_of(["98", "2010"]))
        }
        CodeLanguage::CSharp => SchemaValidator::new().field(
            "version",
            FieldRule::one_of(["7.3", "8", "9", "10", "11", "12"]),
        ),
    }
}

pub fn builtin_validators() -> Vec<(CodeLanguage, SchemaValidator)> {
    CodeLanguage::all().map(|l| (l, schema_for(l))).collect()
}
