mod common;
use common::*;

use retro_script::bytecode::{ScriptStore, SubKind};
use retro_script::{disasm, loader, LoadError};

const COUNTER: &str = "
#function Step
sub ObjectMain
    TempValue0 = 0
    while TempValue0 < 300
        CallFunction(Step)
    loop
    LoadVideo(\"Outro.ogv\")
end sub
function Step
    TempValue0 += 100
    Object.Value0 = -70000
end function
";

fn reload(store: &ScriptStore) -> ScriptStore {
    let data = loader::encode(store);
    let mut loaded = ScriptStore::new();
    loaded.register_type("Test Object").unwrap();
    loader::decode(&data, &mut loaded).unwrap();
    loaded
}

#[test]
fn reloaded_bytecode_runs_the_same() {
    let compiled = compile(COUNTER);
    let loaded = reload(&compiled);
    assert_eq!(loaded.code, compiled.code);
    assert_eq!(loaded.jump_table, compiled.jump_table);
    assert_eq!(loaded.objects[TEST_TYPE].entries, compiled.objects[TEST_TYPE].entries);
    assert_eq!(loaded.functions[0].entry, compiled.functions[0].entry);
    assert_eq!(loaded.functions[0].name, "Function0");

    let mut h = Harness::with_store(loaded);
    h.main();
    assert_eq!(h.temp(0), 300);
    assert_eq!(h.entity().values[0], -70000);
    assert_eq!(h.vm.script_text, "Outro.ogv");
}

#[test]
fn reloaded_bytecode_disassembles() {
    let loaded = reload(&compile(COUNTER));
    let listing = disasm::dump(&loaded).unwrap();
    assert!(listing.contains("TestObject.subObjectMain (jump base 0):"));
    assert!(listing.contains("function Function0"));
    assert!(listing.contains("WLower 0, TempValue0, 300"));
    assert!(listing.contains("LoadVideo \"Outro.ogv\""));
    assert!(listing.contains("Equal Object.Value0, -70000"));
}

#[test]
fn files_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Scripts.bin");
    let compiled = compile(COUNTER);
    loader::write_file(&path, &compiled).unwrap();

    let mut loaded = ScriptStore::new();
    loader::read_file(&path, &mut loaded).unwrap();
    assert_eq!(loaded.code, compiled.code);
    assert!(loaded.objects[TEST_TYPE].entry(SubKind::Main).is_some());
    assert!(loaded.objects[TEST_TYPE].entry(SubKind::Draw).is_none());
}

#[test]
fn missing_files_are_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ScriptStore::new();
    let err = loader::read_file(&dir.path().join("Nope.bin"), &mut store).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}
