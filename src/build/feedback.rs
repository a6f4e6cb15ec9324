use colored::*;

/// Turns known configure/make failure signatures into a tip.
pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    pub fn analyze(output: &str) -> Option<String> {
        // 1. Rewrite module without PCRE (usually PCRE_VERSION=system on a
        //    host without the headers)
        if output.contains("requires the PCRE library") {
            return Some(format!(
                "The build needs {} but none was found.\nUnset {} to bundle it, or pass {} in {}.",
                "PCRE".bold().yellow(),
                "PCRE_VERSION=system".bold().green(),
                "--without-http_rewrite_module".bold().green(),
                "NGINX_CONFIGURE_OPTIONS".bold().yellow()
            ));
        }

        // 2. Other missing libraries
        for (marker, lib) in [
            ("the zlib library", "zlib"),
            ("the OpenSSL library", "OpenSSL"),
        ] {
            if output.contains(marker) {
                return Some(format!(
                    "The build needs the {} development headers.\nInstall them on the build host or disable the module that needs them in {}.",
                    lib.bold().red(),
                    "NGINX_CONFIGURE_OPTIONS".bold().yellow()
                ));
            }
        }

        // 3. No compiler
        if output.contains("C compiler cc is not found")
            || output.contains("cc: not found")
            || output.contains("cc: command not found")
        {
            return Some(format!(
                "No {} found on the build host.\nThis buildpack compiles from source and needs a C toolchain.",
                "C compiler".bold().red()
            ));
        }

        // 4. Typo in configure options
        if output.contains("invalid option") {
            return Some(format!(
                "{} rejected one of the options.\nCheck {} in {}.",
                "configure".bold().red(),
                "NGINX_CONFIGURE_OPTIONS".bold().yellow(),
                "config/nginx_build.sh".bold().yellow()
            ));
        }

        None
    }
}
