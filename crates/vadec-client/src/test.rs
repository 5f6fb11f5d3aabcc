#[cfg(test)]
pub(crate) fn workspace_dir() -> std::path::PathBuf {
    use std::env;

    let current_dir = env::current_dir().expect("Failed to get current directory");
    current_dir
        .ancestors()
        .nth(2)
        .expect("Failed to go up two directories")
        .to_path_buf()
}

#[cfg(test)]
pub(crate) fn get_test_data_file(name: &str) -> std::path::PathBuf {
    let full_path = workspace_dir().join("data").join(name);
    assert!(full_path.exists(), "Test file does not exist: {:?}", full_path);
    full_path
}

#[cfg(test)]
pub(crate) fn get_vadec_lib() -> std::path::PathBuf {
    let target_dir = workspace_dir().join("target").join("debug");
    let lib_name = {
        #[cfg(target_os = "macos")]
        {
            "libvadec_lib.dylib"
        }
        #[cfg(not(target_os = "macos"))]
        {
            "libvadec_lib.so"
        }
    };
    let full_path = target_dir.join(lib_name);
    assert!(
        full_path.exists(),
        "Library file does not exist: {:?}",
        full_path
    );
    full_path
}
