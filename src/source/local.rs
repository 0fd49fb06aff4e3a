use super::DEFAULT_REF;
use std::path::{Path, PathBuf};

/// Returns the full path of `reference` if it names something on disk:
/// an existing absolute path, or a path relative to `work_dir`.
pub fn is_local(work_dir: &Path, reference: &str) -> Option<PathBuf> {
    let path = Path::new(reference);
    if path.is_absolute() {
        return path.exists().then(|| path.to_path_buf());
    }
    let joined = work_dir.join(path);
    joined.exists().then_some(joined)
}

/// Version of a local source: the checked-out branch of the enclosing git
/// repository, the short commit id when HEAD is detached, or `latest`.
pub fn repo_version(path: &Path) -> String {
    let repo = match git2::Repository::discover(path) {
        Ok(repo) => repo,
        Err(_) => return DEFAULT_REF.to_string(),
    };

    let head = match repo.head() {
        Ok(head) => head,
        // Fresh repository without commits
        Err(e) => {
            tracing::debug!("No HEAD in {}: {}", path.display(), e);
            return DEFAULT_REF.to_string();
        }
    };

    if head.is_branch() {
        if let Some(name) = head.shorthand() {
            return name.to_string();
        }
    }

    head.target()
        .map(|oid| {
            let id = oid.to_string();
            id[..id.len().min(7)].to_string()
        })
        .unwrap_or_else(|| DEFAULT_REF.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn relative_path_is_local() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("svc")).unwrap();
        assert_eq!(
            is_local(temp.path(), "svc"),
            Some(temp.path().join("svc"))
        );
    }

    #[test]
    fn missing_path_is_not_local() {
        let temp = TempDir::new().unwrap();
        assert_eq!(is_local(temp.path(), "acme/svc"), None);
        assert_eq!(is_local(temp.path(), "/definitely/not/here/devloop"), None);
    }

    #[test]
    fn version_outside_git_is_latest() {
        let temp = TempDir::new().unwrap();
        assert_eq!(repo_version(temp.path()), "latest");
    }

    #[test]
    fn version_of_unborn_repo_is_latest() {
        let temp = TempDir::new().unwrap();
        git2::Repository::init(temp.path()).unwrap();
        assert_eq!(repo_version(temp.path()), "latest");
    }

    #[test]
    fn version_is_current_branch() {
        let temp = TempDir::new().unwrap();
        let repo = git2::Repository::init(temp.path()).unwrap();
        let sig = git2::Signature::now("dev", "dev@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let commit = repo
            .commit(None, &sig, &sig, "init", &tree, &[])
            .unwrap();
        let commit = repo.find_commit(commit).unwrap();
        repo.branch("feature-x", &commit, false).unwrap();
        repo.set_head("refs/heads/feature-x").unwrap();

        let nested = temp.path().join("svc");
        fs::create_dir(&nested).unwrap();
        assert_eq!(repo_version(&nested), "feature-x");
    }
}
