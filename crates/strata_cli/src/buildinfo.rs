//! `strata buildinfo`: print the persisted build info.

use strata_incremental::{readable_build_info, BuildInfo};

use crate::project::Project;
use crate::{BuildInfoArgs, GlobalArgs};

/// Runs the `strata buildinfo` command.
///
/// Prints the file as written, or with `--readable` expanded so that every
/// file id shows the name it stands for.
pub fn run(args: &BuildInfoArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(None, global)?;
    let file = project
        .build_info_file()
        .ok_or("project is not incremental; set `incremental` or `composite`")?;
    let text = std::fs::read_to_string(&file).map_err(|e| format!("failed to read {file}: {e}"))?;
    println!("{}", render(&text, args.readable)?);
    Ok(0)
}

fn render(text: &str, readable: bool) -> Result<String, Box<dyn std::error::Error>> {
    if !readable {
        return Ok(text.to_string());
    }
    let build_info = BuildInfo::parse(text)?;
    Ok(serde_json::to_string_pretty(&readable_build_info(&build_info)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_incremental::BUILD_INFO_VERSION;

    #[test]
    fn raw_text_is_passed_through() {
        assert_eq!(render("{\"version\":\"x\"}", false).unwrap(), "{\"version\":\"x\"}");
    }

    #[test]
    fn readable_expands_names() {
        let text = format!(
            "{{\"version\":\"{BUILD_INFO_VERSION}\",\"fileNames\":[\"./a.ts\",\"./b.ts\"],\
             \"fileInfos\":[\"v1\",\"v2\"],\"fileIdsList\":[[1]],\"referencedMap\":[[2,1]]}}"
        );
        let rendered: serde_json::Value = serde_json::from_str(&render(&text, true).unwrap()).unwrap();
        assert_eq!(rendered["referencedMap"]["./b.ts"], serde_json::json!(["./a.ts"]));
    }

    #[test]
    fn readable_rejects_other_versions() {
        assert!(render("{\"version\":\"0.0.0-other\"}", true).is_err());
    }
}
