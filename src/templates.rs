//! Contents of the generated runtime files.
//!
//! - `bin/start-<package>` - launch script
//! - `Procfile` - process manifest entry
//! - `.profile.d/<package>.sh` - PATH patch
//! - `config/<package>.conf.erb` - default server config template

use crate::package::PackageProfile;

pub fn launch_script(profile: &PackageProfile) -> String {
    let name = profile.name;
    let config_file = profile.config_file_relative();
    format!(
        r#"#!/usr/bin/env bash
# Generated by slugforge on first build. Local edits are kept.
set -e

if [ -f {config_file} ]; then
  . {config_file}
fi

erb config/{name}.conf.erb > config/{name}.conf

mkdir -p logs
touch logs/access.log logs/error.log

# Stream logs to stdout until this process exits.
tail --pid=$$ -qF -n 0 logs/access.log logs/error.log &

exec {binary} {args}
"#,
        binary = profile.binary,
        args = profile.foreground_args,
    )
}

pub fn process_manifest(profile: &PackageProfile) -> String {
    format!(
        "{}: bin/{}\n",
        profile.process_type,
        profile.launch_script_name()
    )
}

pub fn path_patch(profile: &PackageProfile) -> String {
    format!("export PATH=\"$HOME/vendor/{}/bin:$PATH\"\n", profile.name)
}

/// `release` output for platforms that read default process types.
pub fn release_yaml(profile: &PackageProfile) -> String {
    format!(
        "---\ndefault_process_types:\n  {}: bin/{}\n",
        profile.process_type,
        profile.launch_script_name()
    )
}

pub fn server_config(profile: &PackageProfile) -> String {
    match profile.name {
        "nginx" => NGINX_CONF_ERB.to_string(),
        other => format!("# {} configuration\n", other),
    }
}

const NGINX_CONF_ERB: &str = r#"worker_processes <%= ENV['NGINX_WORKERS'] || 4 %>;
pid nginx.pid;

events {
  use epoll;
  accept_mutex on;
  worker_connections 1024;
}

http {
  gzip on;
  gzip_comp_level 2;
  gzip_min_length 512;

  server_tokens off;

  log_format main '$remote_addr - $remote_user [$time_local] "$request" '
                  '$status $body_bytes_sent "$http_referer" "$http_user_agent"';
  access_log logs/access.log main;
  error_log logs/error.log;

  default_type application/octet-stream;
  sendfile on;

  client_body_timeout 5;

  server {
    listen <%= ENV["PORT"] %>;
    server_name _;
    keepalive_timeout 5;

    location / {
      root public;
    }
  }
}
"#;
