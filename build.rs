use cfg_aliases::cfg_aliases;

fn main() {
    // Setup cfg aliases
    cfg_aliases! {
        // Platforms
        linux: {
            any(
                target_os = "linux",
                target_os = "dragonfly",
                target_os = "freebsd",
                target_os = "netbsd",
                target_os = "openbsd"
            )
        },
        macos_platform: { target_os = "macos" },
        windows_platform: { target_os = "windows" },
        x11_platform: { all(linux, feature = "x11") },

        // dependencies
        serde: { feature = "serde" },
    }
}
