/// Argument builder for the game command line
use crate::game::launcher::classpath::OsType;
use crate::game::launcher::config::SupervisorConfig;
use crate::game::launcher::types::LaunchOptions;
use crate::game::launcher::version_parser::{rules_allow, Argument, ResolvedVersion};
use base64::Engine;
use dunce::canonicalize;
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_SERVER_PORT: u16 = 25565;
const LOOPBACK_HOST: &str = "127.0.0.1";

/// Inputs shared by the JVM and game argument builders
pub struct ArgumentContext<'a> {
    pub options: &'a LaunchOptions,
    pub version: &'a ResolvedVersion,
    pub config: &'a SupervisorConfig,
    pub classpath: &'a str,
    pub natives_dir: &'a Path,
    pub os: OsType,
}

impl<'a> ArgumentContext<'a> {
    fn launcher_name(&self) -> &str {
        self.options
            .launcher_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.config.launcher_name)
    }

    fn launcher_version(&self) -> &str {
        self.options
            .launcher_brand
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.config.launcher_version)
    }

    fn features(&self) -> HashMap<String, bool> {
        let mut features = HashMap::new();
        features.insert("is_demo_user".to_string(), false);
        features.insert(
            "has_custom_resolution".to_string(),
            self.options.resolution.is_some(),
        );
        features
    }
}

/// Full argument vector after the java executable: JVM flags, main class,
/// game arguments.
pub fn build_command_arguments(ctx: &ArgumentContext<'_>) -> Vec<String> {
    let mut args = build_jvm_arguments(ctx);
    args.push(ctx.version.main_class.clone());
    args.extend(build_game_arguments(ctx));
    args
}

/// Build JVM arguments for launching the game
pub fn build_jvm_arguments(ctx: &ArgumentContext<'_>) -> Vec<String> {
    let options = ctx.options;
    let mut args = Vec::new();

    if let Some(min) = options.min_memory {
        args.push(format!("-Xms{}M", min));
    }
    if let Some(max) = options.max_memory {
        args.push(format!("-Xmx{}M", max));
    }

    if options.extra_jvm_args.is_empty() {
        args.extend(default_jvm_args());
    } else {
        args.extend(
            options
                .extra_jvm_args
                .iter()
                .filter(|s| !s.trim().is_empty())
                .cloned(),
        );
    }

    if let Some(ref agent) = options.yggdrasil_agent {
        args.push(format!(
            "-javaagent:{}={}",
            display_path(&agent.jar),
            agent.server
        ));
        if let Some(ref prefetched) = agent.prefetched {
            let encoded = base64::engine::general_purpose::STANDARD.encode(prefetched.as_bytes());
            args.push(format!("-Dauthlibinjector.yggdrasil.prefetched={}", encoded));
        }
    }

    let variables = build_jvm_variables(ctx);
    let features = ctx.features();
    let mut manifest_args = Vec::new();
    for arg in &ctx.version.arguments.jvm {
        manifest_args.extend(process_argument(arg, &variables, ctx.os, &features, false));
    }

    let has_natives_path = manifest_args
        .iter()
        .any(|a| a.starts_with("-Djava.library.path="));
    let has_launcher_brand = manifest_args
        .iter()
        .any(|a| a.starts_with("-Dminecraft.launcher.brand="));
    let has_launcher_version = manifest_args
        .iter()
        .any(|a| a.starts_with("-Dminecraft.launcher.version="));

    if !has_natives_path {
        args.push(format!(
            "-Djava.library.path={}",
            display_path(ctx.natives_dir)
        ));
    }
    if !has_launcher_brand {
        args.push(format!("-Dminecraft.launcher.brand={}", ctx.launcher_name()));
    }
    if !has_launcher_version {
        args.push(format!(
            "-Dminecraft.launcher.version={}",
            ctx.launcher_version()
        ));
    }

    args.extend(manifest_args);

    // Legacy manifests carry no JVM arguments, so nothing put the classpath in
    let has_classpath = args
        .iter()
        .any(|a| a == "-cp" || a == "-classpath" || a.starts_with("-cp="));
    if !has_classpath {
        args.push("-cp".to_string());
        args.push(ctx.classpath.to_string());
    }

    args
}

/// Build game arguments for launching the game
pub fn build_game_arguments(ctx: &ArgumentContext<'_>) -> Vec<String> {
    let options = ctx.options;
    let variables = build_game_variables(ctx);
    let features = ctx.features();

    let mut args = Vec::new();
    for arg in &ctx.version.arguments.game {
        args.extend(process_argument(arg, &variables, ctx.os, &features, true));
    }

    if let Some(ref server) = options.server {
        let host = match options.user.authority.as_deref() {
            Some(authority) if ctx.config.is_dev_authority(authority) => {
                log::debug!(
                    "[launch] Rewriting server host {} to {} for authority {}",
                    server.host,
                    LOOPBACK_HOST,
                    authority
                );
                LOOPBACK_HOST.to_string()
            }
            _ => server.host.clone(),
        };
        args.push("--server".to_string());
        args.push(host);
        args.push("--port".to_string());
        args.push(server.port.unwrap_or(DEFAULT_SERVER_PORT).to_string());
    }

    if let Some(resolution) = options.resolution {
        if !args.iter().any(|a| a == "--width") {
            args.push("--width".to_string());
            args.push(resolution.width.to_string());
            args.push("--height".to_string());
            args.push(resolution.height.to_string());
        }
        if resolution.fullscreen && !args.iter().any(|a| a == "--fullscreen") {
            args.push("--fullscreen".to_string());
        }
    }

    args.extend(
        options
            .extra_mc_args
            .iter()
            .filter(|s| !s.trim().is_empty())
            .cloned(),
    );

    args
}

/// Expand one manifest argument. Game arguments are split on whitespace
/// (quotes respected); JVM arguments stay single tokens so values such as
/// `-DFabricMcEmu= net.minecraft.client.main.Main ` survive. A part naming a
/// missing or empty placeholder drops the whole argument group.
fn process_argument(
    arg: &Argument,
    variables: &HashMap<String, String>,
    os: OsType,
    features: &HashMap<String, bool>,
    split: bool,
) -> Vec<String> {
    let parts: Vec<&str> = match arg {
        Argument::Simple(s) => vec![s.as_str()],
        Argument::Conditional { rules, value } => {
            if !rules_allow(rules, os, features) {
                return Vec::new();
            }
            value.parts()
        }
    };

    let mut out = Vec::new();
    for part in parts {
        if contains_empty_placeholder(part, variables) {
            return Vec::new();
        }
        let substituted = substitute_variables(part, variables);
        if split {
            out.extend(split_preserving_quotes(&substituted));
        } else if !substituted.trim().is_empty() {
            out.push(substituted);
        }
    }
    out
}

/// Substitute variables in a string
pub fn substitute_variables(text: &str, variables: &HashMap<String, String>) -> String {
    let mut result = text.to_string();

    for (key, value) in variables {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

/// True when `text` has a placeholder (e.g. `${foo}`) that is missing from
/// `variables` or maps to an empty string.
fn contains_empty_placeholder(text: &str, variables: &HashMap<String, String>) -> bool {
    let mut idx = 0usize;
    while let Some(start) = text[idx..].find("${") {
        let abs = idx + start + 2;
        match text[abs..].find('}') {
            Some(end_rel) => {
                let end = abs + end_rel;
                match variables.get(&text[abs..end]) {
                    Some(v) if !v.trim().is_empty() => {}
                    _ => return true,
                }
                idx = end + 1;
            }
            None => return true,
        }
    }

    false
}

/// Splits a string into whitespace-separated tokens while respecting
/// single and double quotes. Quotes are removed from returned tokens.
pub(crate) fn split_preserving_quotes(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut in_double = false;
    let mut in_single = false;

    for c in s.chars() {
        match c {
            '"' if !in_single => in_double = !in_double,
            '\'' if !in_double => in_single = !in_single,
            c if c.is_whitespace() && !in_double && !in_single => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
            }
            c => buf.push(c),
        }
    }

    if !buf.is_empty() {
        out.push(buf);
    }

    out
}

fn display_path(path: &Path) -> String {
    canonicalize(path)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string())
}

fn build_jvm_variables(ctx: &ArgumentContext<'_>) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    vars.insert("natives_directory".to_string(), display_path(ctx.natives_dir));
    vars.insert("launcher_name".to_string(), ctx.launcher_name().to_string());
    vars.insert(
        "launcher_version".to_string(),
        ctx.launcher_version().to_string(),
    );
    vars.insert("classpath".to_string(), ctx.classpath.to_string());
    vars.insert(
        "library_directory".to_string(),
        display_path(&ctx.options.libraries_dir()),
    );
    vars.insert(
        "classpath_separator".to_string(),
        ctx.os.classpath_separator().to_string(),
    );
    vars.insert("version_name".to_string(), ctx.version.id.clone());
    vars.insert(
        "primary_jar".to_string(),
        display_path(&ctx.version.jar_path(&ctx.options.root)),
    );

    vars
}

fn build_game_variables(ctx: &ArgumentContext<'_>) -> HashMap<String, String> {
    let options = ctx.options;
    let user = &options.user;
    let mut vars = HashMap::new();

    vars.insert("auth_player_name".to_string(), user.name.clone());
    vars.insert("auth_uuid".to_string(), user.uuid.clone());
    vars.insert("auth_access_token".to_string(), user.access_token.clone());
    vars.insert("auth_session".to_string(), user.access_token.clone());
    vars.insert("user_type".to_string(), user.user_type.clone());
    if let Some(ref xuid) = user.xuid {
        vars.insert("auth_xuid".to_string(), xuid.clone());
    }
    vars.insert("user_properties".to_string(), "{}".to_string());

    vars.insert("version_name".to_string(), ctx.version.id.clone());
    vars.insert(
        "version_type".to_string(),
        ctx.version
            .version_type
            .clone()
            .unwrap_or_else(|| "release".to_string()),
    );
    vars.insert("launcher_name".to_string(), ctx.launcher_name().to_string());
    vars.insert(
        "launcher_version".to_string(),
        ctx.launcher_version().to_string(),
    );

    vars.insert(
        "game_directory".to_string(),
        display_path(options.working_dir()),
    );
    let assets = display_path(&options.assets_dir());
    vars.insert("assets_root".to_string(), assets.clone());
    // Pre-1.6 manifests use ${game_assets}
    vars.insert("game_assets".to_string(), assets);
    if let Some(id) = ctx.version.assets_id() {
        vars.insert("assets_index_name".to_string(), id.to_string());
    }

    if let Some(resolution) = options.resolution {
        vars.insert(
            "resolution_width".to_string(),
            resolution.width.to_string(),
        );
        vars.insert(
            "resolution_height".to_string(),
            resolution.height.to_string(),
        );
    }

    vars
}

fn default_jvm_args() -> Vec<String> {
    vec![
        "-XX:+UseG1GC".to_string(),
        "-XX:+UnlockExperimentalVMOptions".to_string(),
        "-XX:G1NewSizePercent=20".to_string(),
        "-XX:G1ReservePercent=20".to_string(),
        "-XX:MaxGCPauseMillis=50".to_string(),
        "-XX:G1HeapRegionSize=32M".to_string(),
    ]
}
