/*!

The bookmark container format.

A bookmark is a small, self-contained binary store. It holds a set of tables of contents (TOCs),
each mapping property keys to typed records. macOS writes one when a program asks for a
persistent reference to a file, and resolves it later to find that file again.

Every multi-byte integer in the format is little-endian. The one exception is the date payload,
which is a big-endian IEEE 754 double.

# Header

```text
+--------+-----------+-----------+-------------+------------------+
| "book" | total_len | version   | header_size | zero padding ... |
| 4 B    | u32 LE    | u32 LE    | u32 LE      | to header_size   |
+--------+-----------+-----------+-------------+------------------+
```

| Field         | Notes                                                            |
| --            | --                                                               |
| magic         | `book`. Files starting with `alis` are old-style alias records.  |
| total_len     | Length of the whole bookmark. Trailing bytes past it are ignored.|
| version       | `0x10040000` in every file seen in the wild.                     |
| header_size   | Offset of the body, usually 48. Never less than 16.              |

Everything after the header is the *body*. Offsets inside the body are called *slots*, and are
counted from the start of the body, not the start of the file.

The first 4 bytes of the body hold the slot of the first TOC. Records follow from slot 4. Every
slot is a multiple of 4, and no record overlaps a TOC.

# Records

```text
+--------+--------+-------------------+-------------------+
| len    | tag    | payload           | padding           |
| u32 LE | u32 LE | len bytes         | to 4-byte boundary|
+--------+--------+-------------------+-------------------+
```

The tag splits into a type (`tag & 0xFFFFFF00`) and a subtype (`tag & 0xFF`):

| Type     | Tag      | Subtype                                     | Payload                         |
| --       | --       | --                                          | --                              |
| String   | `0x0100` | 1                                           | UTF-8 bytes, no terminator      |
| Data     | `0x0200` | 1                                           | Raw bytes                       |
| Number   | `0x0300` | CFNumber type, 1 through 16                 | Little-endian integer or float  |
| Date     | `0x0400` | 0                                           | Big-endian f64, seconds since 2001-01-01T00:00:00Z |
| Boolean  | `0x0500` | 0 is false, 1 is true                       | Empty                           |
| Array    | `0x0600` | 1                                           | u32 slots of the elements       |
| Dict     | `0x0700` | 1                                           | u32 slots, alternating key and value |
| UUID     | `0x0800` | 1                                           | 16 raw bytes                    |
| URL      | `0x0900` | 1 is absolute, 2 is relative                | Absolute: UTF-8 text. Relative: slot of the base URL, then slot of a string |
| Null     | `0x0A00` | 1                                           | Empty                           |

Number subtypes follow CoreFoundation:

| Subtype | Type      | Width |
| --      | --        | --    |
| 1       | SInt8     | 1     |
| 2       | SInt16    | 2     |
| 3       | SInt32    | 4     |
| 4       | SInt64    | 8     |
| 5       | Float32   | 4     |
| 6       | Float64   | 8     |
| 7       | Char      | 1     |
| 8       | Short     | 2     |
| 9       | Int       | 4     |
| 10      | Long      | 8     |
| 11      | LongLong  | 8     |
| 12      | Float     | 4     |
| 13      | Double    | 8     |
| 14      | CFIndex   | 8     |
| 15      | NSInteger | 8     |
| 16      | CGFloat   | 8     |

Records may be shared. Two array elements, or two relative URLs, may point at the same slot. A
record that refers back to one of its own ancestors is malformed, and decodes as an unresolved
reference.

# Tables of Contents

```text
+--------+------------+--------+--------+--------+------------------------+
| size   | 0xFFFFFFFE | id     | next   | count  | count entries          |
| u32 LE | u32 LE     | u32 LE | u32 LE | u32 LE | 12 bytes each          |
+--------+------------+--------+--------+--------+------------------------+
```

Each entry is a key, the slot of the value record, and a reserved word written as zero. Entries
are sorted by key. `next` is the slot of the following TOC, or 0 at the end of the chain.

Apple writes `size` as `12 + 12 * count`. Other writers disagree, so readers only check that the
table fits inside the body.

A key with the high bit (`0x80000000`) set is not a numeric property. The rest of the key is the
slot of a string record naming the property.

TOC 1 describes the bookmarked item. Other TOC ids are referenced from it, the most common being
the bookmark of the volume holding the item.

# Well-known keys

| Key      | Property                        | Value                            |
| --       | --                              | --                               |
| `0x1003` | URL                             | URL                              |
| `0x1004` | Path components                 | Array of strings                 |
| `0x1005` | File ids along the path         | Array of numbers                 |
| `0x1010` | Resource properties             | 24-byte flag blob                |
| `0x1020` | File name                       | String                           |
| `0x1030` | File id                         | Number                           |
| `0x1040` | Creation date                   | Date                             |
| `0x2002` | Volume path                     | String                           |
| `0x2005` | Volume URL                      | URL                              |
| `0x2010` | Volume name                     | String                           |
| `0x2011` | Volume UUID                     | String                           |
| `0x2012` | Volume size                     | Number                           |
| `0x2013` | Volume creation date            | Date                             |
| `0x2020` | Volume properties               | 24-byte flag blob                |
| `0x2030` | Volume is the root filesystem   | Boolean                          |
| `0x2040` | Disk image volume bookmark      | Number, the id of another TOC    |
| `0x2050` | Volume mount point              | URL                              |
| `0xC001` | Containing folder index         | Number                           |
| `0xC011` | Creator user name               | String                           |
| `0xC012` | Creator uid                     | Number                           |
| `0xD001` | Was a file reference URL        | Boolean                          |
| `0xD010` | Creation options                | Number                           |
| `0xE003` | URL lengths                     | Array of numbers                 |
| `0xF017` | Localized display name          | String                           |
| `0xF030` | Bookmark creation time          | Date                             |
| `0xF080` | Sandbox read-write extension    | Data                             |
| `0xF081` | Sandbox read-only extension     | Data                             |
| `0xFE00` | Embedded alias record           | Data                             |

The flag blobs are three u64 words: the flags, a mask of which flags are valid, and a reserved
word.

*/
