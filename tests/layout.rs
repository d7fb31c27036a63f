use glitch_export::domain::Category;
use glitch_export::layout::Layout;

#[test]
fn layout_paths() {
    let layout = Layout::new("out");
    let project = layout.project_dir(Category::Archived, "proj-one");
    assert_eq!(project.as_str(), "out/archived/proj-one");
    assert_eq!(layout.archive_path("proj-one").as_str(), "out/archives/proj-one.tgz");
    assert_eq!(
        Layout::assets_dir(&project).as_str(),
        "out/archived/proj-one/glitch-assets"
    );
    assert_eq!(
        Layout::manifest_path(&project).as_str(),
        "out/archived/proj-one/.glitch-assets"
    );
}

#[test]
fn ensure_and_remove() {
    let temp = tempfile::tempdir().unwrap();
    let root = camino::Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let layout = Layout::new(root);
    layout.ensure_dirs(Category::Active).unwrap();
    assert!(layout.archives_dir().as_std_path().is_dir());
    assert!(layout.category_dir(Category::Active).as_std_path().is_dir());

    let project = layout.project_dir(Category::Active, "p");
    std::fs::create_dir_all(project.join("nested").as_std_path()).unwrap();
    Layout::remove_project(&project).unwrap();
    assert!(!project.as_std_path().exists());
    Layout::remove_project(&project).unwrap();
}
