//! Search order, resolution and lifecycle tests against real trees on disk.

use std::fs;
use std::path::{Path, PathBuf};

use pak_vfs::{FileSystem, FindResult, SearchFlags, VfsConfig, VfsError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn stored() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
}

fn write_pack(path: &Path, entries: &[(&str, &[u8])]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, data) in entries {
        if let Some(dir) = name.strip_suffix('/') {
            zip.add_directory(dir, stored()).unwrap();
        } else {
            use std::io::Write;
            zip.start_file(*name, stored()).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap();
}

struct Fixture {
    _tmp: TempDir,
    base: PathBuf,
    save: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("game");
        let save = tmp.path().join("save");
        fs::create_dir_all(base.join("base")).unwrap();
        fs::write(base.join("base/default.cfg"), b"// defaults\n").unwrap();
        Self {
            _tmp: tmp,
            base,
            save,
        }
    }

    fn config(&self) -> VfsConfig {
        VfsConfig {
            base_path: self.base.clone(),
            save_path: self.save.clone(),
            abort_on_misuse: false,
            ..VfsConfig::default()
        }
    }

    fn base_dir(&self) -> PathBuf {
        self.base.join("base")
    }
}

fn read_string(fs: &FileSystem, path: &str) -> String {
    String::from_utf8(fs.read_file(path).unwrap().bytes().to_vec()).unwrap()
}

#[test]
fn missing_base_content_fails_init() {
    let tmp = TempDir::new().unwrap();
    let config = VfsConfig {
        base_path: tmp.path().join("game"),
        save_path: tmp.path().join("save"),
        abort_on_misuse: false,
        ..VfsConfig::default()
    };
    match FileSystem::init(config) {
        Err(VfsError::MissingBaseContent) => {}
        other => panic!("expected MissingBaseContent, got {other:?}"),
    }
}

#[test]
fn loose_files_shadow_packs_of_the_same_layer() {
    let fx = Fixture::new();
    write_pack(
        &fx.base_dir().join("pak0.pk4"),
        &[("text/hello.txt", b"from pack")],
    );
    fs::create_dir_all(fx.base_dir().join("text")).unwrap();
    fs::write(fx.base_dir().join("text/hello.txt"), b"from disk").unwrap();

    let fs = FileSystem::init(fx.config()).unwrap();
    assert_eq!(read_string(&fs, "text/hello.txt"), "from disk");
}

#[test]
fn later_added_roots_shadow_earlier_ones() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.save.join("base")).unwrap();
    fs::write(fx.base_dir().join("override.txt"), b"install").unwrap();
    fs::write(fx.save.join("base/override.txt"), b"save").unwrap();

    // the save root is added after the installation root
    let fs = FileSystem::init(fx.config()).unwrap();
    assert_eq!(read_string(&fs, "override.txt"), "save");
}

#[test]
fn higher_numbered_packs_shadow_lower_numbered_ones() {
    let fx = Fixture::new();
    write_pack(&fx.base_dir().join("pak0.pk4"), &[("shared.txt", b"pak0")]);
    write_pack(&fx.base_dir().join("pak1.pk4"), &[("shared.txt", b"pak1")]);

    let fs = FileSystem::init(fx.config()).unwrap();
    assert_eq!(read_string(&fs, "shared.txt"), "pak1");
}

#[test]
fn resolution_is_deterministic_across_restarts() {
    let fx = Fixture::new();
    write_pack(&fx.base_dir().join("pak0.pk4"), &[("shared.txt", b"pak0")]);
    write_pack(&fx.base_dir().join("pak1.pk4"), &[("shared.txt", b"pak1")]);

    let mut fs = FileSystem::init(fx.config()).unwrap();
    let order = fs.describe_search_order();
    let checksums = fs.pack_checksums();

    fs.restart().unwrap();
    assert_eq!(fs.describe_search_order(), order);
    assert_eq!(fs.pack_checksums(), checksums);
    assert_eq!(read_string(&fs, "shared.txt"), "pak1");
}

#[test]
fn lookup_ignores_case_and_separators() {
    let fx = Fixture::new();
    write_pack(
        &fx.base_dir().join("pak0.pk4"),
        &[("sound/fx/Ricochet.wav", b"wav")],
    );
    fs::create_dir_all(fx.base_dir().join("models")).unwrap();
    fs::write(fx.base_dir().join("models/crate.lwo"), b"lwo").unwrap();

    let fs = FileSystem::init(fx.config()).unwrap();
    // pack entries compare case and separator insensitively
    assert!(fs.open_file_read("SOUND\\FX\\RICOCHET.WAV").is_ok());
    // loose files fall back to the on-disk casing
    assert!(fs.open_file_read("Models/CRATE.LWO").is_ok());
}

#[test]
fn traversal_paths_never_resolve() {
    let fx = Fixture::new();
    fs::write(fx.base.join("secret.txt"), b"outside").unwrap();

    let fs = FileSystem::init(fx.config()).unwrap();
    assert!(matches!(
        fs.open_file_read("../secret.txt"),
        Err(VfsError::NotFound(_))
    ));
    assert!(matches!(
        fs.open_file_read("text/../../secret.txt"),
        Err(VfsError::NotFound(_))
    ));
    assert!(matches!(
        fs.write_file("../evil.txt", b"x"),
        Err(VfsError::InvalidArgument(_))
    ));
    assert!(!fx.base.join("evil.txt").exists());
}

#[test]
fn write_then_read_round_trips_with_nul_guarantee() {
    let fx = Fixture::new();
    let fs = FileSystem::init(fx.config()).unwrap();

    let body = b"bind \"w\" \"_forward\"\n";
    assert_eq!(fs.write_file("config/user.cfg", body).unwrap(), body.len());

    let contents = fs.read_file("config/user.cfg").unwrap();
    assert_eq!(contents.bytes(), body);
    assert_eq!(contents.len(), body.len());
    assert_eq!(contents.bytes_with_nul().last(), Some(&0));

    // the write landed under the save root, not the installation
    assert!(fx.save.join("base/config/user.cfg").exists());
    assert!(!fx.base_dir().join("config/user.cfg").exists());
}

#[test]
fn written_files_shadow_installed_content() {
    let fx = Fixture::new();
    write_pack(&fx.base_dir().join("pak0.pk4"), &[("tweak.cfg", b"stock")]);

    let fs = FileSystem::init(fx.config()).unwrap();
    assert_eq!(read_string(&fs, "tweak.cfg"), "stock");

    fs.write_file("tweak.cfg", b"custom").unwrap();
    assert_eq!(read_string(&fs, "tweak.cfg"), "custom");

    fs.remove_file("tweak.cfg").unwrap();
    assert_eq!(read_string(&fs, "tweak.cfg"), "stock");
}

#[test]
fn stat_file_reports_size_and_provenance() {
    let fx = Fixture::new();
    write_pack(&fx.base_dir().join("pak0.pk4"), &[("packed.txt", b"12345")]);
    fs::write(fx.base_dir().join("loose.txt"), b"1234567").unwrap();

    let fs = FileSystem::init(fx.config()).unwrap();
    let packed = fs.stat_file("packed.txt").unwrap();
    assert_eq!(packed.len, 5);
    assert!(packed.in_pack);

    let loose = fs.stat_file("loose.txt").unwrap();
    assert_eq!(loose.len, 7);
    assert!(!loose.in_pack);

    assert!(fs.stat_file("absent.txt").is_err());
}

#[test]
fn search_flags_select_layers() {
    let fx = Fixture::new();
    write_pack(&fx.base_dir().join("pak0.pk4"), &[("only/in.pak", b"p")]);
    fs::create_dir_all(fx.base_dir().join("only")).unwrap();
    fs::write(fx.base_dir().join("only/on.disk"), b"d").unwrap();

    let fs = FileSystem::init(fx.config()).unwrap();
    assert!(fs.open_file_read_flags("only/in.pak", SearchFlags::DIRS_ONLY).is_err());
    assert!(fs.open_file_read_flags("only/in.pak", SearchFlags::PAKS_ONLY).is_ok());
    assert!(fs.open_file_read_flags("only/on.disk", SearchFlags::PAKS_ONLY).is_err());
    assert!(fs.open_file_read_flags("only/on.disk", SearchFlags::DIRS_ONLY).is_ok());
}

#[test]
fn restricted_mode_allows_only_listed_kinds_from_directories() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.base_dir().join("maps")).unwrap();
    fs::write(fx.base_dir().join("maps/city.map"), b"map").unwrap();
    fs::write(fx.base_dir().join("autoexec.cfg"), b"cfg").unwrap();
    write_pack(&fx.base_dir().join("pak0.pk4"), &[("maps/packed.map", b"m")]);

    let fs = FileSystem::init(fx.config()).unwrap();
    fs.set_restricted(true);

    assert!(fs.open_file_read("maps/city.map").is_err());
    assert!(fs.open_file_read("autoexec.cfg").is_ok());
    // pack content is unaffected
    assert!(fs.open_file_read("maps/packed.map").is_ok());

    fs.set_restricted(false);
    assert!(fs.open_file_read("maps/city.map").is_ok());
}

#[test]
fn list_files_merges_layers_without_duplicates() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.base_dir().join("def")).unwrap();
    fs::write(fx.base_dir().join("def/a.def"), b"a").unwrap();
    fs::write(fx.base_dir().join("def/b.DEF"), b"b").unwrap();
    write_pack(
        &fx.base_dir().join("pak0.pk4"),
        &[
            ("def/A.DEF", b"shadowed"),
            ("def/c.def", b"c"),
            ("def/sub/", b""),
            ("def/sub/d.def", b"d"),
            ("def/readme.txt", b"not a def"),
        ],
    );

    let fs = FileSystem::init(fx.config()).unwrap();

    let names = fs.list_files("def", ".def", true, false, None).unwrap();
    assert_eq!(names, vec!["a.def", "b.DEF", "c.def"]);

    let dirs = fs.list_files("def", "/", true, false, None).unwrap();
    assert_eq!(dirs, vec!["sub"]);

    // the match-everything filter reports files only, never directories
    let all = fs.list_files("def", "", true, false, None).unwrap();
    assert_eq!(all, vec!["a.def", "b.DEF", "c.def", "readme.txt"]);

    let tree = fs.list_files_tree("def", ".def", true, None).unwrap();
    assert_eq!(
        tree,
        vec!["def/a.def", "def/b.DEF", "def/c.def", "def/sub/d.def"]
    );
}

#[test]
fn list_files_supports_alternative_extensions() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.base_dir().join("snd")).unwrap();
    fs::write(fx.base_dir().join("snd/a.wav"), b"w").unwrap();
    fs::write(fx.base_dir().join("snd/b.ogg"), b"o").unwrap();
    fs::write(fx.base_dir().join("snd/c.txt"), b"t").unwrap();

    let fs = FileSystem::init(fx.config()).unwrap();
    let names = fs.list_files("snd", ".wav|.ogg", true, false, None).unwrap();
    assert_eq!(names, vec!["a.wav", "b.ogg"]);
}

#[test]
fn inactive_addons_resolve_only_through_find_file() {
    let fx = Fixture::new();
    write_pack(
        &fx.base_dir().join("zaddon.pk4"),
        &[("addon.conf", b""), ("bonus/level.map", b"map")],
    );

    let mut fs = FileSystem::init(fx.config()).unwrap();
    assert!(fs.open_file_read("bonus/level.map").is_err());
    assert_eq!(
        fs.find_file("bonus/level.map", true).unwrap(),
        FindResult::NeedsRestart
    );

    fs.restart().unwrap();
    assert_eq!(
        fs.find_file("bonus/level.map", true).unwrap(),
        FindResult::Found
    );
    assert_eq!(read_string(&fs, "bonus/level.map"), "map");

    assert_eq!(
        fs.find_file("no/such.file", true).unwrap(),
        FindResult::NotFound
    );
}

#[test]
fn find_file_without_scheduling_leaves_addons_inactive() {
    let fx = Fixture::new();
    write_pack(
        &fx.base_dir().join("zaddon.pk4"),
        &[("addon.conf", b""), ("bonus/level.map", b"map")],
    );

    let mut fs = FileSystem::init(fx.config()).unwrap();
    assert_eq!(
        fs.find_file("bonus/level.map", false).unwrap(),
        FindResult::NeedsRestart
    );

    // nothing was scheduled, so a restart changes nothing
    fs.restart().unwrap();
    assert_eq!(
        fs.find_file("bonus/level.map", false).unwrap(),
        FindResult::NeedsRestart
    );
    assert!(fs.open_file_read("bonus/level.map").is_err());
}

#[test]
fn activating_an_addon_pulls_in_its_dependencies() {
    let fx = Fixture::new();
    let dep_path = fx.base_dir().join("zdep.pk4");
    write_pack(&dep_path, &[("addon.conf", b""), ("dep/data.txt", b"dep")]);
    let dep_checksum = pak_vfs::PakArchive::load(&dep_path).unwrap().checksum();

    let conf = format!("addonDef {{\n \"{dep_checksum:#010x}\"\n}}\n");
    write_pack(
        &fx.base_dir().join("zmain.pk4"),
        &[("addon.conf", conf.as_bytes()), ("main/data.txt", b"main")],
    );

    let mut fs = FileSystem::init(fx.config()).unwrap();
    assert!(fs.open_file_read("main/data.txt").is_err());
    assert!(fs.open_file_read("dep/data.txt").is_err());

    assert_eq!(
        fs.find_file("main/data.txt", true).unwrap(),
        FindResult::NeedsRestart
    );
    fs.restart().unwrap();

    // the scheduled addon and its dependency are both active now
    assert_eq!(read_string(&fs, "main/data.txt"), "main");
    assert_eq!(read_string(&fs, "dep/data.txt"), "dep");
}

#[test]
fn activating_a_dependency_does_not_activate_its_dependents() {
    let fx = Fixture::new();
    let dep_path = fx.base_dir().join("zdep.pk4");
    write_pack(&dep_path, &[("addon.conf", b""), ("dep/data.txt", b"dep")]);
    let dep_checksum = pak_vfs::PakArchive::load(&dep_path).unwrap().checksum();

    let conf = format!("addonDef {{\n \"{dep_checksum:#010x}\"\n}}\n");
    write_pack(
        &fx.base_dir().join("zmain.pk4"),
        &[("addon.conf", conf.as_bytes()), ("main/data.txt", b"main")],
    );

    let mut fs = FileSystem::init(fx.config()).unwrap();
    fs.schedule_addon_activation(dep_checksum);
    fs.restart().unwrap();

    assert_eq!(read_string(&fs, "dep/data.txt"), "dep");
    assert!(fs.open_file_read("main/data.txt").is_err());
}

#[test]
fn search_addons_config_activates_everything() {
    let fx = Fixture::new();
    write_pack(
        &fx.base_dir().join("zaddon.pk4"),
        &[("addon.conf", b""), ("bonus/level.map", b"map")],
    );

    let config = VfsConfig {
        search_addons: true,
        ..fx.config()
    };
    let fs = FileSystem::init(config).unwrap();
    assert!(fs.open_file_read("bonus/level.map").is_ok());
}

#[test]
fn addon_map_decls_cover_inactive_packs() {
    let fx = Fixture::new();
    let conf = b"addonDef { }\nmapDef \"maps/bonus.map\" {\n \"name\" \"Bonus\"\n}\n";
    write_pack(
        &fx.base_dir().join("zaddon.pk4"),
        &[("addon.conf", conf.as_slice()), ("maps/bonus.map", b"m")],
    );

    let fs = FileSystem::init(fx.config()).unwrap();
    let decls = fs.addon_map_decls();
    assert_eq!(decls.len(), 1);
    assert_eq!(decls[0].path, "maps/bonus.map");
    assert_eq!(decls[0].keys["name"], "Bonus");
}

#[test]
fn downloaded_pack_is_searchable_at_lowest_precedence() {
    let fx = Fixture::new();
    write_pack(
        &fx.base_dir().join("pak0.pk4"),
        &[("shared.txt", b"from base")],
    );

    let mut fs = FileSystem::init(fx.config()).unwrap();
    fs::create_dir_all(fx.save.join("base")).unwrap();
    write_pack(
        &fx.save.join("base/newpak.pk4"),
        &[("shared.txt", b"from download"), ("fresh.txt", b"fresh")],
    );

    let checksum = fs.add_downloaded_pack("base/newpak.pk4").unwrap();
    assert!(fs.pack_for_checksum(checksum, false).is_some());

    // available immediately, but below everything already in the chain
    assert_eq!(read_string(&fs, "fresh.txt"), "fresh");
    assert_eq!(read_string(&fs, "shared.txt"), "from base");

    // a restart sorts the save layer above the installation
    fs.restart().unwrap();
    assert_eq!(read_string(&fs, "shared.txt"), "from download");
}

#[test]
fn validate_download_pack_refuses_stock_and_mismatched_packs() {
    let fx = Fixture::new();
    write_pack(&fx.base_dir().join("pak0.pk4"), &[("stock.txt", b"s")]);
    write_pack(&fx.base_dir().join("mymod.pk4"), &[("mod.txt", b"m")]);
    write_pack(
        &fx.base_dir().join("game01.pk4"),
        &[("binary.conf", b"0"), ("gamex86.so", b"\x7fELF")],
    );

    let fs = FileSystem::init(fx.config()).unwrap();
    // look the packs up through their checksums
    let checksums = fs.pack_checksums();
    let find = |name: &str| {
        checksums
            .iter()
            .copied()
            .find(|&c| fs.pack_for_checksum(c, false).unwrap().filename() == name)
            .unwrap()
    };

    assert!(fs.validate_download_pack(find("pak0.pk4"), false).is_none());
    assert!(fs.validate_download_pack(find("game01.pk4"), false).is_none());

    let (rel, len) = fs.validate_download_pack(find("mymod.pk4"), false).unwrap();
    assert_eq!(rel, "base/mymod.pk4");
    assert!(len > 0);

    let (rel, _) = fs.validate_download_pack(find("game01.pk4"), true).unwrap();
    assert_eq!(rel, "base/game01.pk4");
}

#[test]
fn binary_module_is_extracted_from_binary_packs() {
    let fx = Fixture::new();
    write_pack(
        &fx.base_dir().join("game01.pk4"),
        &[("binary.conf", b"0 2"), ("gamex86.so", b"\x7fELF fake")],
    );

    let fs = FileSystem::init(fx.config()).unwrap();
    let location = fs.find_binary_module("gamex86.so").unwrap().unwrap();
    assert!(location.os_path.exists());
    assert!(location.os_path.starts_with(&fx.save));
    assert!(location.pack_checksum.is_some());
    assert_eq!(fs::read(&location.os_path).unwrap(), b"\x7fELF fake");

    fs.update_binary_pack_checksums().unwrap();
    assert_eq!(fs.binary_pack_for_platform(0), location.pack_checksum);
    assert_eq!(fs.binary_pack_for_platform(2), location.pack_checksum);
    assert_eq!(fs.binary_pack_for_platform(1), None);
    assert_eq!(fs.binary_pack_for_platform(pak_vfs::MAX_PLATFORMS + 1), None);
}

#[test]
fn loose_binary_module_is_preferred_when_not_older() {
    let fx = Fixture::new();
    write_pack(
        &fx.base_dir().join("game01.pk4"),
        &[("binary.conf", b"0"), ("gamex86.so", b"packed")],
    );
    fs::write(fx.base_dir().join("gamex86.so"), b"loose").unwrap();

    let fs = FileSystem::init(fx.config()).unwrap();
    let location = fs.find_binary_module("gamex86.so").unwrap().unwrap();
    // the loose copy has a current mtime, the packed one a 1980 zip stamp
    assert_eq!(fs::read(&location.os_path).unwrap(), b"loose");
    assert_eq!(location.pack_checksum, None);
}

#[test]
fn find_pack_for_file_checksum_matches_content() {
    let fx = Fixture::new();
    write_pack(&fx.base_dir().join("pak0.pk4"), &[("x.txt", b"hello")]);

    let fs = FileSystem::init(fx.config()).unwrap();
    let mut file = fs.open_file_read("x.txt").unwrap();
    let checksum = fs.compute_file_checksum(&mut file).unwrap();

    assert!(fs.find_pack_for_file_checksum("x.txt", checksum).is_some());
    assert!(fs.find_pack_for_file_checksum("x.txt", checksum ^ 1).is_none());
}

#[test]
fn mission_layer_takes_top_precedence() {
    let fx = Fixture::new();
    write_pack(&fx.base_dir().join("pak0.pk4"), &[("briefing.txt", b"stock")]);

    let mission_dir = fx.save.join("base/fms/heist");
    fs::create_dir_all(&mission_dir).unwrap();
    fs::write(mission_dir.join("briefing.txt"), b"mission").unwrap();

    let config = VfsConfig {
        mission_name: "heist".to_string(),
        ..fx.config()
    };
    let fs = FileSystem::init(config).unwrap();
    assert_eq!(read_string(&fs, "briefing.txt"), "mission");
    assert_eq!(fs.game_folder(), "heist");
}

#[test]
fn reads_can_be_restricted_to_one_game_folder() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.base.join("mymod")).unwrap();
    fs::write(fx.base.join("mymod/notes.txt"), b"mod notes").unwrap();
    fs::write(fx.base_dir().join("notes.txt"), b"base notes").unwrap();

    let config = VfsConfig {
        mod_name: "mymod".to_string(),
        ..fx.config()
    };
    let fs = FileSystem::init(config).unwrap();

    // unrestricted resolution takes the mod layer
    let mut file = fs.open_file_read("notes.txt").unwrap();
    let mut text = String::new();
    std::io::Read::read_to_string(&mut file, &mut text).unwrap();
    assert_eq!(text, "mod notes");

    // pinned to the stock folder, the base copy wins
    let mut file = fs.open_file_read_in("notes.txt", "base").unwrap();
    text.clear();
    std::io::Read::read_to_string(&mut file, &mut text).unwrap();
    assert_eq!(text, "base notes");
}

#[test]
fn shutdown_turns_operations_into_errors() {
    let fx = Fixture::new();
    let mut fs = FileSystem::init(fx.config()).unwrap();
    fs.shutdown();
    assert!(!fs.is_initialized());
    assert!(matches!(
        fs.read_file("default.cfg"),
        Err(VfsError::Uninitialized)
    ));
    fs.restart().unwrap();
    assert!(fs.read_file("default.cfg").is_ok());
}

#[test]
#[should_panic(expected = "filesystem misuse")]
fn misuse_aborts_by_default() {
    let fx = Fixture::new();
    let config = VfsConfig {
        abort_on_misuse: true,
        ..fx.config()
    };
    let mut fs = FileSystem::init(config).unwrap();
    fs.shutdown();
    let _ = fs.read_file("default.cfg");
}

#[test]
fn explicit_os_paths_bypass_the_search_order() {
    let fx = Fixture::new();
    let fs = FileSystem::init(fx.config()).unwrap();

    let out = fx.save.join("exported/dump.bin");
    {
        use std::io::Write;
        let mut file = fs.open_explicit_write(&out).unwrap();
        file.write_all(b"payload").unwrap();
    }
    let mut file = fs.open_explicit_read(&out).unwrap();
    let mut data = Vec::new();
    use std::io::Read;
    file.read_to_end(&mut data).unwrap();
    assert_eq!(data, b"payload");
}

#[test]
fn append_extends_existing_files() {
    let fx = Fixture::new();
    let fs = FileSystem::init(fx.config()).unwrap();

    fs.write_file("logs/run.log", b"one\n").unwrap();
    {
        use std::io::Write;
        let mut file = fs.open_file_append("logs/run.log").unwrap();
        file.write_all(b"two\n").unwrap();
    }
    assert_eq!(read_string(&fs, "logs/run.log"), "one\ntwo\n");
}

#[test]
fn create_temp_file_is_writable_and_anonymous() {
    let fx = Fixture::new();
    let fs = FileSystem::init(fx.config()).unwrap();

    use std::io::{Read, Seek, SeekFrom, Write};
    let mut temp = fs.create_temp_file().unwrap();
    temp.write_all(b"scratch").unwrap();
    temp.seek(SeekFrom::Start(0)).unwrap();
    let mut data = String::new();
    temp.read_to_string(&mut data).unwrap();
    assert_eq!(data, "scratch");
}
