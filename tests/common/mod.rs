#![allow(dead_code)]

use assert_fs::TempDir;
use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;

pub const PHOTO_DETAILS: &str = "\
imgName,fileChecksum,favorite,hidden,originalCreationDate,viewCount,importDate,contributedByMe,deleted
IMG_0001.HEIC,c2hhMQ==,no,no,\"Sunday August 13,2023 3:09 PM GMT\",3,\"Sunday August 13,2023 3:10 PM GMT\",no,no
IMG_0002.JPG,c2hhMg==,no,no,\"Friday March 26,2021 4:25 PM PDT\",0,\"Friday March 26,2021 4:30 PM PDT\",no,no
IMG_0003.MOV,c2hhMw==,no,no,\"Monday January 2,2023 9:00 AM GMT\",0,\"Monday January 2,2023 9:00 AM GMT\",no,yes
IMG_0001.HEIC,c2hhNA==,no,no,\"Tuesday May 5,2020 1:00 PM GMT\",0,\"Tuesday May 5,2020 1:00 PM GMT\",no,no
";

pub const SHARED_DETAILS: &str = "\
imgName,contributedByMe
IMG_0002.JPG,yes
IMG_9999.JPG,no
";

/// Lay out a small unzipped export under `temp_dir` and return its root.
///
/// `Photos/` holds two catalogued files, one deleted row, one duplicate row,
/// one orphan shared row and one untracked file.
pub fn setup_export(temp_dir: &TempDir) -> ChildPath {
    let root = temp_dir.child("export");
    let photos = root.child("Photos");
    photos.create_dir_all().unwrap();
    photos.child("Photo Details.csv").write_str(PHOTO_DETAILS).unwrap();
    photos
        .child("Shared Library Details.csv")
        .write_str(SHARED_DETAILS)
        .unwrap();
    photos.child("IMG_0001.HEIC").write_str("heic bytes").unwrap();
    photos.child("IMG_0002.JPG").write_str("jpeg bytes").unwrap();
    photos.child("IMG_0003.MOV").write_str("deleted movie").unwrap();
    photos.child("IMG_0004.PNG").write_str("screenshot").unwrap();
    root
}
